//! # Response Decoder
//!
//! The P21 answers queries with a fixed text prefix followed by a fixed-length
//! binary payload, and answers escape controls with short prefix-less frames.
//!
//! | Reply | Layout | Length after prefix |
//! |-------|--------|---------------------|
//! | `BATTERY ` | level (BCD), charging flag | 2 (+ optional CRLF) |
//! | `CONFIG ` | protocol, dpi, hw[3], fw[3], reserved[2], trailer[2] | 12 |
//! | ready status | status byte | 1 |
//! | pause-cancel ack | opaque | 1..=8 |
//!
//! ## CONFIG Layout
//!
//! ```text
//! CONFIG 00 cb 00 00 03 04 02 04 02 01 0d 0a
//!        │  │  └──┬───┘ └──┬───┘ └─┬─┘ └─┬─┘
//!        │  │     hw       fw   reserved trailer
//!        │  └ dpi code (0xCB = 203)
//!        └ protocol
//! ```
//!
//! The trailer is `0d 0a` in every capture so far, which reads as a line
//! terminator, but it sits inside the fixed 12-byte payload. [`TrailerMode`]
//! selects whether it is kept opaque or required to be CRLF.
//!
//! Decoding is pure: the same bytes always give the same result.

use std::fmt;

use serde::Serialize;

use crate::error::NelkoError;
use crate::protocol::commands::{CR, LF, Query};

/// Payload bytes after `BATTERY `.
pub const BATTERY_PAYLOAD_LEN: usize = 2;

/// Payload bytes after `CONFIG `, trailer included.
pub const CONFIG_PAYLOAD_LEN: usize = 12;

/// Longest prefix-less frame treated as an acknowledgement.
pub const MAX_ACK_LEN: usize = 8;

/// How the last two CONFIG payload bytes are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailerMode {
    /// Keep them as opaque bytes in `ConfigStatus::trailer`
    #[default]
    Opaque,
    /// Require them to be CRLF
    Terminator,
}

/// Which reply the session is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Query(Query),
    Ready,
    PauseCancel,
}

// ============================================================================
// STATUS TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatteryStatus {
    pub percent_raw: u8,
    pub flag: u8,
}

impl BatteryStatus {
    /// Battery level in percent.
    ///
    /// The level byte is binary-coded decimal: 0x75 is 75 %. Returns `None`
    /// when either nibble is not a decimal digit.
    pub fn percent(&self) -> Option<u8> {
        let high = self.percent_raw >> 4;
        let low = self.percent_raw & 0x0F;
        if high > 9 || low > 9 {
            return None;
        }
        Some(high * 10 + low)
    }

    /// The printer reports 99 % while charging; unplug it for a real reading.
    pub fn is_charging(&self) -> bool {
        self.flag != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigStatus {
    pub protocol: u8,
    pub dpi_code: u8,
    pub hw_version: [u8; 3],
    pub fw_version: [u8; 3],
    pub reserved: [u8; 2],
    pub trailer: [u8; 2],
}

/// Auto power-off setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AutoOff {
    Never,
    Minutes(u8),
    Unknown(u8),
}

impl fmt::Display for AutoOff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoOff::Never => f.write_str("Never"),
            AutoOff::Minutes(m) => write!(f, "{} minutes", m),
            AutoOff::Unknown(code) => write!(f, "Unknown (0x{:02X})", code),
        }
    }
}

impl ConfigStatus {
    /// Resolution in DPI, reading `protocol` and `dpi_code` as one big-endian word.
    pub fn dpi(&self) -> u16 {
        u16::from_be_bytes([self.protocol, self.dpi_code])
    }

    pub fn hardware_version(&self) -> String {
        dotted(&self.hw_version)
    }

    pub fn firmware_version(&self) -> String {
        dotted(&self.fw_version)
    }

    /// Auto power-off, reading `reserved[0]` as the settings code.
    pub fn auto_off(&self) -> AutoOff {
        match self.reserved[0] {
            0 => AutoOff::Never,
            1 => AutoOff::Minutes(15),
            2 => AutoOff::Minutes(30),
            3 => AutoOff::Minutes(60),
            other => AutoOff::Unknown(other),
        }
    }

    /// Beeper setting, reading `reserved[1]`.
    pub fn beep(&self) -> bool {
        self.reserved[1] != 0
    }

    pub fn trailer_is_crlf(&self) -> bool {
        self.trailer == [CR, LF]
    }
}

fn dotted(parts: &[u8; 3]) -> String {
    format!("{}.{}.{}", parts[0], parts[1], parts[2])
}

/// # Ready Status (reply to ESC ! ?)
///
/// | Bit | Meaning |
/// |-----|---------|
/// | 0 | Head open |
/// | 1 | Paper jam |
/// | 2 | Out of paper |
/// | 3 | Out of ribbon |
/// | 4 | Paused |
/// | 5 | Printing |
/// | 6 | Cover open |
/// | 7 | Over temperature |
///
/// A zero byte means ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadyStatus {
    pub ready: bool,
    pub status: u8,
}

impl ReadyStatus {
    pub const HEAD_OPEN: u8 = 0x01;
    pub const PAPER_JAM: u8 = 0x02;
    pub const OUT_OF_PAPER: u8 = 0x04;
    pub const OUT_OF_RIBBON: u8 = 0x08;
    pub const PAUSED: u8 = 0x10;
    pub const PRINTING: u8 = 0x20;
    pub const COVER_OPEN: u8 = 0x40;
    pub const OVER_TEMPERATURE: u8 = 0x80;

    const NAMES: [(u8, &'static str); 8] = [
        (Self::HEAD_OPEN, "head open"),
        (Self::PAPER_JAM, "paper jam"),
        (Self::OUT_OF_PAPER, "out of paper"),
        (Self::OUT_OF_RIBBON, "out of ribbon"),
        (Self::PAUSED, "paused"),
        (Self::PRINTING, "printing"),
        (Self::COVER_OPEN, "cover open"),
        (Self::OVER_TEMPERATURE, "over temperature"),
    ];

    pub fn from_byte(status: u8) -> Self {
        Self {
            ready: status == 0,
            status,
        }
    }

    pub fn has(&self, flag: u8) -> bool {
        self.status & flag != 0
    }

    pub fn is_paused(&self) -> bool {
        self.has(Self::PAUSED)
    }

    pub fn is_printing(&self) -> bool {
        self.has(Self::PRINTING)
    }

    /// Names of every condition bit that is set.
    pub fn conditions(&self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(bit, _)| self.has(*bit))
            .map(|(_, name)| *name)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PauseCancelAck {
    pub raw: Vec<u8>,
}

/// A decoded device reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceStatus {
    Battery(BatteryStatus),
    Config(ConfigStatus),
    Ready(ReadyStatus),
    PauseCancelAck(PauseCancelAck),
}

impl DeviceStatus {
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceStatus::Battery(_) => "battery",
            DeviceStatus::Config(_) => "config",
            DeviceStatus::Ready(_) => "ready",
            DeviceStatus::PauseCancelAck(_) => "pause-cancel ack",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Battery(battery) => {
                match battery.percent() {
                    Some(p) => writeln!(f, "Battery Level: {}%", p)?,
                    None => writeln!(f, "Battery Level: unknown (0x{:02X})", battery.percent_raw)?,
                }
                if battery.is_charging() {
                    write!(
                        f,
                        "Charging: Charging\nUnplug the printer to get a current battery reading."
                    )
                } else {
                    write!(f, "Charging: Not Charging")
                }
            }
            DeviceStatus::Config(config) => {
                writeln!(f, "DPI Resolution: {}", config.dpi())?;
                writeln!(f, "Hardware Version: {}", config.hardware_version())?;
                writeln!(f, "Firmware Version: {}", config.firmware_version())?;
                writeln!(f, "Timeout: {}", config.auto_off())?;
                write!(f, "Beep: {}", if config.beep() { "On" } else { "Off" })
            }
            DeviceStatus::Ready(ready) if ready.ready => write!(f, "Ready"),
            DeviceStatus::Ready(ready) => write!(f, "Not ready: {}", ready.conditions().join(", ")),
            DeviceStatus::PauseCancelAck(ack) => {
                write!(f, "Pause cancelled ({})", hex::encode(&ack.raw))
            }
        }
    }
}

// ============================================================================
// DECODING
// ============================================================================

/// Prefix/length signature of a query reply.
struct Signature {
    prefix: &'static [u8],
    payload_len: usize,
    parse: fn(&[u8], TrailerMode) -> Result<DeviceStatus, NelkoError>,
}

static SIGNATURES: [Signature; 2] = [
    Signature {
        prefix: b"BATTERY ",
        payload_len: BATTERY_PAYLOAD_LEN,
        parse: parse_battery,
    },
    Signature {
        prefix: b"CONFIG ",
        payload_len: CONFIG_PAYLOAD_LEN,
        parse: parse_config,
    },
];

fn signature_for(query: Query) -> &'static Signature {
    match query {
        Query::Battery => &SIGNATURES[0],
        Query::Config => &SIGNATURES[1],
    }
}

fn parse_battery(payload: &[u8], _mode: TrailerMode) -> Result<DeviceStatus, NelkoError> {
    Ok(DeviceStatus::Battery(BatteryStatus {
        percent_raw: payload[0],
        flag: payload[1],
    }))
}

fn parse_config(payload: &[u8], mode: TrailerMode) -> Result<DeviceStatus, NelkoError> {
    let config = ConfigStatus {
        protocol: payload[0],
        dpi_code: payload[1],
        hw_version: [payload[2], payload[3], payload[4]],
        fw_version: [payload[5], payload[6], payload[7]],
        reserved: [payload[8], payload[9]],
        trailer: [payload[10], payload[11]],
    };
    if mode == TrailerMode::Terminator && !config.trailer_is_crlf() {
        return Err(NelkoError::malformed("CONFIG trailer is not CRLF", payload));
    }
    Ok(DeviceStatus::Config(config))
}

fn decode_signature(
    sig: &Signature,
    raw: &[u8],
    mode: TrailerMode,
) -> Result<DeviceStatus, NelkoError> {
    let expected = sig.prefix.len() + sig.payload_len;
    let body = &raw[sig.prefix.len()..];
    if body.len() < sig.payload_len {
        return Err(NelkoError::IncompleteResponse {
            received: raw.len(),
            expected,
        });
    }
    let (payload, rest) = body.split_at(sig.payload_len);
    match rest {
        [] | [CR] | [CR, LF] => (sig.parse)(payload, mode),
        _ => Err(NelkoError::malformed("unexpected bytes after payload", raw)),
    }
}

/// Decode a reply using the default [`TrailerMode`].
///
/// ## Example
///
/// ```
/// use nelko::protocol::response::{decode, BatteryStatus, DeviceStatus};
///
/// let status = decode(b"BATTERY \x99\x00").unwrap();
/// assert_eq!(status, DeviceStatus::Battery(BatteryStatus { percent_raw: 0x99, flag: 0 }));
/// ```
pub fn decode(raw: &[u8]) -> Result<DeviceStatus, NelkoError> {
    decode_with(raw, TrailerMode::default())
}

/// Classify raw reply bytes without knowing which command produced them.
///
/// 1. `BATTERY ` / `CONFIG ` prefix: fixed-length payload
/// 2. a strict prefix of one of those tokens (even a lone `B` or `C`): incomplete
/// 3. any other single byte: ready status
/// 4. 2..=8 other bytes: pause-cancel acknowledgement
///
/// A 1-byte pause-cancel acknowledgement is indistinguishable from a ready
/// status here; [`decode_reply`] uses the command that was sent instead.
pub fn decode_with(raw: &[u8], mode: TrailerMode) -> Result<DeviceStatus, NelkoError> {
    if raw.is_empty() {
        return Err(NelkoError::IncompleteResponse {
            received: 0,
            expected: 1,
        });
    }

    if let Some(sig) = SIGNATURES.iter().find(|sig| raw.starts_with(sig.prefix)) {
        return decode_signature(sig, raw, mode);
    }

    if let Some(sig) = SIGNATURES.iter().find(|sig| sig.prefix.starts_with(raw)) {
        return Err(NelkoError::IncompleteResponse {
            received: raw.len(),
            expected: sig.prefix.len() + sig.payload_len,
        });
    }

    if raw.starts_with(b"ERROR") {
        return Err(NelkoError::malformed("device reported an error", raw));
    }

    match raw.len() {
        1 => Ok(DeviceStatus::Ready(ReadyStatus::from_byte(raw[0]))),
        2..=MAX_ACK_LEN => Ok(DeviceStatus::PauseCancelAck(PauseCancelAck { raw: raw.to_vec() })),
        _ => Err(NelkoError::malformed("unrecognized reply", raw)),
    }
}

/// Decode a reply to a known command.
///
/// - `Query(q)`: the reply must carry `q`'s prefix
/// - `Ready`: the first byte is the status byte, anything after it is ignored
/// - `PauseCancel`: any non-empty frame is the acknowledgement
pub fn decode_reply(
    kind: ReplyKind,
    raw: &[u8],
    mode: TrailerMode,
) -> Result<DeviceStatus, NelkoError> {
    match kind {
        ReplyKind::Query(query) => {
            let sig = signature_for(query);
            if raw.starts_with(sig.prefix) {
                decode_signature(sig, raw, mode)
            } else if sig.prefix.starts_with(raw) {
                Err(NelkoError::IncompleteResponse {
                    received: raw.len(),
                    expected: sig.prefix.len() + sig.payload_len,
                })
            } else {
                Err(NelkoError::malformed(
                    &format!("expected {} reply", String::from_utf8_lossy(sig.prefix).trim()),
                    raw,
                ))
            }
        }
        ReplyKind::Ready => match raw.first() {
            Some(&status) => Ok(DeviceStatus::Ready(ReadyStatus::from_byte(status))),
            None => Err(NelkoError::IncompleteResponse {
                received: 0,
                expected: 1,
            }),
        },
        ReplyKind::PauseCancel => {
            if raw.is_empty() {
                return Err(NelkoError::IncompleteResponse {
                    received: 0,
                    expected: 1,
                });
            }
            Ok(DeviceStatus::PauseCancelAck(PauseCancelAck { raw: raw.to_vec() }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG_SAMPLE: &[u8] = b"CONFIG \x00\xcb\x00\x00\x03\x04\x02\x04\x02\x01\x0d\x0a";

    #[test]
    fn test_decode_battery_sample() {
        let status = decode(b"BATTERY \x99\x00").unwrap();
        assert_eq!(
            status,
            DeviceStatus::Battery(BatteryStatus {
                percent_raw: 0x99,
                flag: 0x00
            })
        );
    }

    #[test]
    fn test_decode_battery_with_crlf() {
        let status = decode(b"BATTERY \x75\x01\r\n").unwrap();
        let DeviceStatus::Battery(battery) = status else {
            panic!("expected battery status");
        };
        assert_eq!(battery.percent(), Some(75));
        assert!(battery.is_charging());
    }

    #[test]
    fn test_battery_percent_bcd() {
        let battery = |raw| BatteryStatus {
            percent_raw: raw,
            flag: 0,
        };
        assert_eq!(battery(0x99).percent(), Some(99));
        assert_eq!(battery(0x05).percent(), Some(5));
        assert_eq!(battery(0x1A).percent(), None);
    }

    #[test]
    fn test_decode_config_sample() {
        let status = decode(CONFIG_SAMPLE).unwrap();
        let DeviceStatus::Config(config) = status else {
            panic!("expected config status");
        };
        assert_eq!(config.protocol, 0x00);
        assert_eq!(config.dpi_code, 0xCB);
        assert_eq!(config.hw_version, [0x00, 0x00, 0x03]);
        assert_eq!(config.fw_version, [0x04, 0x02, 0x04]);
        assert_eq!(config.reserved, [0x02, 0x01]);
        assert_eq!(config.trailer, [0x0D, 0x0A]);
        assert_eq!(config.dpi(), 203);
        assert_eq!(config.hardware_version(), "0.0.3");
        assert_eq!(config.firmware_version(), "4.2.4");
        assert_eq!(config.auto_off(), AutoOff::Minutes(30));
        assert!(config.beep());
    }

    #[test]
    fn test_config_trailer_modes() {
        let mut odd = CONFIG_SAMPLE.to_vec();
        let len = odd.len();
        odd[len - 2] = 0x00;
        odd[len - 1] = 0x01;

        let opaque = decode_with(&odd, TrailerMode::Opaque).unwrap();
        assert!(matches!(opaque, DeviceStatus::Config(c) if c.trailer == [0x00, 0x01]));

        assert!(decode_with(CONFIG_SAMPLE, TrailerMode::Terminator).is_ok());
        assert!(matches!(
            decode_with(&odd, TrailerMode::Terminator),
            Err(NelkoError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_short_config_is_incomplete() {
        for cut in 1..CONFIG_SAMPLE.len() {
            assert!(
                matches!(
                    decode(&CONFIG_SAMPLE[..cut]),
                    Err(NelkoError::IncompleteResponse { expected: 19, .. })
                ),
                "cut at {} should be incomplete",
                cut
            );
        }
    }

    #[test]
    fn test_partial_prefix_is_incomplete() {
        assert!(matches!(decode(b"BATT"), Err(NelkoError::IncompleteResponse { .. })));
        assert!(matches!(decode(b"CONFIG"), Err(NelkoError::IncompleteResponse { .. })));
        assert!(matches!(decode(b""), Err(NelkoError::IncompleteResponse { .. })));
        assert!(matches!(
            decode(b"B"),
            Err(NelkoError::IncompleteResponse { received: 1, expected: 10 })
        ));
        assert!(matches!(
            decode(b"C"),
            Err(NelkoError::IncompleteResponse { received: 1, expected: 19 })
        ));
    }

    #[test]
    fn test_ready_reply_keeps_prefix_letters() {
        // After ESC ! ? the same bytes are plain status bytes
        let status = decode_reply(ReplyKind::Ready, b"C", TrailerMode::Opaque).unwrap();
        assert_eq!(status, DeviceStatus::Ready(ReadyStatus::from_byte(b'C')));
    }

    #[test]
    fn test_unknown_prefix_is_malformed() {
        assert!(matches!(
            decode(b"STATUS \x01\x02\x03\x04\x05"),
            Err(NelkoError::MalformedResponse(_))
        ));
        assert!(matches!(decode(b"ERROR0"), Err(NelkoError::MalformedResponse(_))));
    }

    #[test]
    fn test_trailing_garbage_is_malformed() {
        assert!(matches!(
            decode(b"BATTERY \x50\x00XY"),
            Err(NelkoError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_short_frames() {
        assert_eq!(
            decode(&[0x00]).unwrap(),
            DeviceStatus::Ready(ReadyStatus {
                ready: true,
                status: 0
            })
        );
        let paused = decode(&[0x10]).unwrap();
        assert!(matches!(paused, DeviceStatus::Ready(r) if !r.ready && r.is_paused()));
        assert_eq!(
            decode(&[0x00, 0x00]).unwrap(),
            DeviceStatus::PauseCancelAck(PauseCancelAck { raw: vec![0, 0] })
        );
    }

    #[test]
    fn test_decode_is_deterministic() {
        let samples: [&[u8]; 4] = [CONFIG_SAMPLE, b"BATTERY \x99\x00", b"\x04", b"XYZXYZXYZXYZ"];
        for raw in samples {
            assert_eq!(format!("{:?}", decode(raw)), format!("{:?}", decode(raw)));
        }
    }

    #[test]
    fn test_decode_reply_query_mismatch() {
        let result = decode_reply(
            ReplyKind::Query(Query::Battery),
            CONFIG_SAMPLE,
            TrailerMode::Opaque,
        );
        assert!(matches!(result, Err(NelkoError::MalformedResponse(_))));
        let result = decode_reply(ReplyKind::Query(Query::Battery), b"B", TrailerMode::Opaque);
        assert!(matches!(result, Err(NelkoError::IncompleteResponse { .. })));
    }

    #[test]
    fn test_decode_reply_escape_kinds() {
        let ack = decode_reply(ReplyKind::PauseCancel, &[0x00], TrailerMode::Opaque).unwrap();
        assert_eq!(ack, DeviceStatus::PauseCancelAck(PauseCancelAck { raw: vec![0] }));

        let ready = decode_reply(ReplyKind::Ready, &[0x24], TrailerMode::Opaque).unwrap();
        let DeviceStatus::Ready(ready) = ready else {
            panic!("expected ready status");
        };
        assert!(!ready.ready);
        assert_eq!(ready.conditions(), vec!["out of paper", "printing"]);

        assert!(decode_reply(ReplyKind::Ready, &[], TrailerMode::Opaque).is_err());
    }

    #[test]
    fn test_status_display() {
        let status = decode(b"BATTERY \x99\x01").unwrap();
        assert_eq!(
            status.to_string(),
            concat!(
                "Battery Level: 99%\nCharging: Charging\n",
                "Unplug the printer to get a current battery reading."
            )
        );
        assert_eq!(decode(&[0x00]).unwrap().to_string(), "Ready");
    }

    #[test]
    fn test_status_serializes_tagged() {
        let status = decode(b"BATTERY \x42\x00").unwrap();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["type"], "battery");
        assert_eq!(json["percent_raw"], 0x42);
    }
}
