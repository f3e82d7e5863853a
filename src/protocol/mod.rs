//! # P21 Protocol Implementation
//!
//! Encoders and decoders for the command language spoken by the Nelko P21.
//!
//! ## Module Structure
//!
//! - [`commands`]: Queries, escape controls, and the [`Command`] variant
//! - [`tspl`]: TSPL2 statements and print job encoding
//! - [`response`]: Reply classification into [`DeviceStatus`]
//!
//! ## Usage Example
//!
//! ```
//! use nelko::job::{Bitmap, LabelSpec, PrintJob};
//! use nelko::protocol::{commands, response, tspl};
//!
//! let query = commands::encode_query("BATTERY?").unwrap();
//! assert_eq!(query, b"BATTERY?\r\n");
//!
//! let status = response::decode(b"BATTERY \x80\x00").unwrap();
//! println!("{}", status);
//!
//! let job = PrintJob::bitmap(LabelSpec::p21_default(), Bitmap::blank(12, 284));
//! let data = tspl::encode_print_job(&job, &tspl::EncodeOptions::default()).unwrap();
//! assert!(data.ends_with(b"PRINT 1\r\n"));
//! ```

pub mod commands;
pub mod response;
pub mod tspl;

pub use commands::{Command, Escape, LineEnding, Query};
pub use response::{DeviceStatus, ReplyKind, TrailerMode};
pub use tspl::{EncodeOptions, Statement};
