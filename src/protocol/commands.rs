//! # P21 Command Set
//!
//! The P21 accepts three kinds of input on its serial channel:
//!
//! | Kind | Example | Reply |
//! |------|---------|-------|
//! | Query | `BATTERY?\r\n` | `BATTERY ` + 2 bytes |
//! | Escape | `ESC ! ?` | 1 status byte |
//! | TSPL2 statements | `SIZE 14.0 mm,40.0 mm\r\n` ... `PRINT 1\r\n` | none |
//!
//! Queries and statements are line oriented text. Escapes are raw control
//! sequences outside the TSPL2 grammar and carry no line terminator.

use std::fmt;
use std::str::FromStr;

use crate::error::NelkoError;
use crate::protocol::tspl::{self, EncodeOptions, Statement};

// ============================================================================
// CONTROL CONSTANTS
// ============================================================================

/// ESC (Escape) - control sequence prefix
pub const ESC: u8 = 0x1B;

/// CR (Carriage Return)
pub const CR: u8 = 0x0D;

/// LF (Line Feed)
pub const LF: u8 = 0x0A;

/// Second byte of every supported escape sequence
pub const ESC_BANG: u8 = b'!';

/// Opcode: cancel a paused print (`ESC ! o`)
pub const OP_CANCEL_PAUSE: u8 = b'o';

/// Opcode: report ready status (`ESC ! ?`)
pub const OP_READY: u8 = b'?';

/// Line terminator for textual commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\r\n`, what the device captures show
    #[default]
    CrLf,
    /// Bare `\n`
    Lf,
}

impl LineEnding {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::CrLf => b"\r\n",
            LineEnding::Lf => b"\n",
        }
    }
}

// ============================================================================
// QUERIES
// ============================================================================

/// # Status Queries
///
/// | Query | Reply |
/// |-------|-------|
/// | `BATTERY?` | `BATTERY ` + level (BCD) + charging flag |
/// | `CONFIG?` | `CONFIG ` + 12 bytes (resolution, versions, settings) |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Battery,
    Config,
}

impl Query {
    pub const ALL: [Query; 2] = [Query::Battery, Query::Config];

    /// Token as sent on the wire, without terminator.
    pub fn token(self) -> &'static str {
        match self {
            Query::Battery => "BATTERY?",
            Query::Config => "CONFIG?",
        }
    }

    /// Prefix the device puts in front of the reply payload.
    pub fn reply_prefix(self) -> &'static [u8] {
        match self {
            Query::Battery => b"BATTERY ",
            Query::Config => b"CONFIG ",
        }
    }
}

impl FromStr for Query {
    type Err = NelkoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Query::ALL
            .into_iter()
            .find(|q| q.token() == s)
            .ok_or_else(|| NelkoError::UnsupportedQuery(s.to_string()))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Encode a query by name (`"BATTERY?"` or `"CONFIG?"`).
///
/// ## Example
///
/// ```
/// use nelko::protocol::commands;
///
/// assert_eq!(commands::encode_query("BATTERY?").unwrap(), b"BATTERY?\r\n");
/// assert!(commands::encode_query("STATUS?").is_err());
/// ```
pub fn encode_query(name: &str) -> Result<Vec<u8>, NelkoError> {
    let query: Query = name.parse()?;
    Ok(query_bytes(query, LineEnding::default()))
}

/// Encode a typed query with the given line ending.
pub fn query_bytes(query: Query, ending: LineEnding) -> Vec<u8> {
    let mut out = query.token().as_bytes().to_vec();
    out.extend_from_slice(ending.as_bytes());
    out
}

// ============================================================================
// ESCAPES
// ============================================================================

/// # Escape Controls (ESC ! n)
///
/// | Control | Bytes | Reply |
/// |---------|-------|-------|
/// | Cancel pause | 1B 21 6F | short acknowledgement |
/// | Ready check | 1B 21 3F | 1 status byte |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    CancelPause,
    ReadyCheck,
}

impl Escape {
    pub fn opcode(self) -> u8 {
        match self {
            Escape::CancelPause => OP_CANCEL_PAUSE,
            Escape::ReadyCheck => OP_READY,
        }
    }

    pub fn from_opcode(opcode: u8) -> Result<Self, NelkoError> {
        match opcode {
            OP_CANCEL_PAUSE => Ok(Escape::CancelPause),
            OP_READY => Ok(Escape::ReadyCheck),
            other => Err(NelkoError::InvalidOpcode(other)),
        }
    }

    pub fn bytes(self) -> [u8; 3] {
        [ESC, ESC_BANG, self.opcode()]
    }
}

/// Encode the escape sequence for an opcode (`b'o'` or `b'?'`).
///
/// ## Example
///
/// ```
/// use nelko::protocol::commands;
///
/// assert_eq!(commands::encode_escape(b'?').unwrap(), vec![0x1B, 0x21, 0x3F]);
/// assert!(commands::encode_escape(b'x').is_err());
/// ```
pub fn encode_escape(opcode: u8) -> Result<Vec<u8>, NelkoError> {
    Ok(Escape::from_opcode(opcode)?.bytes().to_vec())
}

// ============================================================================
// COMMAND
// ============================================================================

/// Anything the session can put on the wire.
///
/// BITMAP payloads are length-delimited binary inside an otherwise
/// line-oriented stream, so statements are kept structured until encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Query(Query),
    ControlEscape(Escape),
    PrintJobCommands(Vec<Statement>),
}

impl Command {
    pub fn encode(&self, options: &EncodeOptions) -> Result<Vec<u8>, NelkoError> {
        match self {
            Command::Query(query) => Ok(query_bytes(*query, options.line_ending)),
            Command::ControlEscape(escape) => Ok(escape.bytes().to_vec()),
            Command::PrintJobCommands(statements) => tspl::encode_statements(statements, options),
        }
    }

    /// Whether the device answers this command.
    pub fn expects_reply(&self) -> bool {
        !matches!(self, Command::PrintJobCommands(_))
    }
}
