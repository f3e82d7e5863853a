//! # Nelko - P21 Label Printer Library
//!
//! Nelko is a Rust library for the Nelko P21 handheld thermal label printer,
//! which speaks a subset of TSPL2 over Bluetooth SPP. It provides:
//!
//! - **Protocol implementation**: query/escape encoders, TSPL2 statements, reply decoding
//! - **Session**: a request/response state machine with timeouts and cancellation
//! - **Rendering**: image and test pattern conversion to 1-bit TSPL2 bitmaps
//! - **Transport**: Bluetooth RFCOMM communication, plus a scripted mock
//!
//! ## Quick Start
//!
//! ```no_run
//! use nelko::{
//!     job::{LabelSpec, PrintJob},
//!     render::{self, patterns, Dithering},
//!     session::{Session, SessionConfig},
//!     transport::BluetoothTransport,
//!     printer::PrinterConfig,
//! };
//!
//! let mut session = Session::new(SessionConfig::default());
//! session.connect(BluetoothTransport::open("/dev/rfcomm0")?)?;
//!
//! println!("{}%", session.battery()?.percent().unwrap_or(0));
//!
//! let config = PrinterConfig::P21;
//! let rows = PrinterConfig::DEFAULT_RASTER_ROWS;
//! let img = patterns::diagonal_lines(config.width_dots as u32, rows, 4);
//! let bitmap = render::bitmap_from_gray(&img, Dithering::Threshold, Default::default());
//! session.print(PrintJob::bitmap(LabelSpec::p21_default(), bitmap))?;
//!
//! # Ok::<(), nelko::error::NelkoError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | Command encoding and reply decoding |
//! | [`job`] | Label geometry, bitmaps, print jobs |
//! | [`session`] | Printer session state machine |
//! | [`render`] | Dithering and test patterns |
//! | [`transport`] | Communication backends |
//! | [`printer`] | Printer configurations |
//! | [`ota`] | Firmware version check |
//! | [`error`] | Error types |

pub mod error;
pub mod job;
pub mod ota;
pub mod printer;
pub mod protocol;
pub mod render;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use error::NelkoError;
pub use job::{Bitmap, LabelSpec, PrintJob};
pub use printer::PrinterConfig;
pub use protocol::DeviceStatus;
pub use session::{Session, SessionConfig, SessionState};
pub use transport::{BluetoothTransport, MockTransport, Transport};
