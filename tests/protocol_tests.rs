//! # Protocol Tests
//!
//! End-to-end checks of the encoder and decoder against the byte sequences
//! captured from a real P21.

use nelko::NelkoError;
use nelko::job::{Bitmap, BitmapMode, Direction, LabelSpec, PrintJob};
use nelko::protocol::commands::{self, Command, Escape, Query};
use nelko::protocol::response::{self, AutoOff, BatteryStatus, ConfigStatus, DeviceStatus};
use nelko::protocol::tspl::{self, EncodeOptions, Statement};
use nelko::protocol::LineEnding;
use nelko::render::{self, patterns, Dithering};
use pretty_assertions::assert_eq;

/// CONFIG? reply captured from a P21 (firmware 4.2.4).
const CONFIG_REPLY: &str = "434f4e46494720" /* "CONFIG " */;
const CONFIG_PAYLOAD: &str = "00cb00000304020402010d0a";

fn config_reply() -> Vec<u8> {
    let mut raw = hex::decode(CONFIG_REPLY).unwrap();
    raw.extend(hex::decode(CONFIG_PAYLOAD).unwrap());
    raw
}

fn stock_job() -> PrintJob {
    let label = LabelSpec::new(14.0, 40.0)
        .gap(5.0, 0.0)
        .direction(Direction::Normal)
        .density(15);
    PrintJob::bitmap(label, Bitmap::new(12, 284, vec![0u8; 284 * 12])).copies(1)
}

// ============================================================================
// ENCODING
// ============================================================================

#[test]
fn test_stock_label_job_layout() {
    let encoded = tspl::encode_print_job(&stock_job(), &EncodeOptions::default()).unwrap();

    let preamble: &[u8] =
        b"SIZE 14.0 mm,40.0 mm\r\nGAP 5.0 mm,0.0 mm\r\nDIRECTION 0,0\r\nDENSITY 15\r\n\
          CLS\r\nBITMAP 0,0,12,284,1,";
    assert!(encoded.starts_with(preamble));

    let payload = &encoded[preamble.len()..preamble.len() + 3408];
    assert!(payload.iter().all(|&b| b == 0));

    let tail = &encoded[preamble.len() + 3408..];
    assert_eq!(tail, b"\r\nPRINT 1\r\n");
}

#[test]
fn test_bitmap_length_field_matches_payload() {
    let label = LabelSpec::p21_default();
    let cases = [(12, 284), (1, 1), (6, 50), (12, 320)];
    for (width_bytes, height) in cases {
        let data: Vec<u8> = (0..width_bytes * height).map(|i| (i % 251) as u8).collect();
        let job = PrintJob::bitmap(label, Bitmap::new(width_bytes, height, data.clone()));
        let encoded = tspl::encode_print_job(&job, &EncodeOptions::default()).unwrap();

        let (wb, h, mode, offset) = tspl::find_bitmap_header(&encoded).unwrap();
        assert_eq!((wb, h, mode), (width_bytes, height, BitmapMode::Or));
        let declared = (wb * h) as usize;
        assert_eq!(declared, data.len());
        assert_eq!(&encoded[offset..offset + declared], data.as_slice());
    }
}

#[test]
fn test_lf_line_ending() {
    let options = EncodeOptions::default().line_ending(LineEnding::Lf);
    let encoded = tspl::encode_print_job(&stock_job(), &options).unwrap();
    assert!(encoded.starts_with(b"SIZE 14.0 mm,40.0 mm\nGAP 5.0 mm,0.0 mm\n"));
    assert!(encoded.ends_with(b"\nPRINT 1\n"));
}

#[test]
fn test_black_label_job() {
    let job = PrintJob::black_bar(LabelSpec::p21_default()).copies(3);
    let encoded = tspl::encode_print_job(&job, &EncodeOptions::default()).unwrap();
    let text = String::from_utf8(encoded).unwrap();
    assert_eq!(
        text,
        concat!(
            "SIZE 14.0 mm,40.0 mm\r\nGAP 5.0 mm,0.0 mm\r\nDIRECTION 0,0\r\nDENSITY 15\r\n",
            "CLS\r\nBAR 0,0,112,320\r\nPRINT 3\r\n"
        )
    );
}

#[test]
fn test_job_validation_errors() {
    let job = stock_job().copies(0);
    assert!(matches!(
        tspl::encode_print_job(&job, &EncodeOptions::default()),
        Err(NelkoError::CopiesOutOfRange(0))
    ));

    let short = PrintJob::bitmap(LabelSpec::p21_default(), Bitmap::new(12, 284, vec![0; 3407]));
    match tspl::encode_print_job(&short, &EncodeOptions::default()) {
        Err(NelkoError::InvalidGeometry { expected, actual }) => {
            assert_eq!(expected, 3408);
            assert_eq!(actual, 3407);
        }
        other => panic!("expected InvalidGeometry, got {:?}", other),
    }

    let dense = PrintJob::black_bar(LabelSpec::p21_default().density(20));
    assert!(matches!(
        tspl::encode_print_job(&dense, &EncodeOptions::default()),
        Err(NelkoError::InvalidLabel(_))
    ));
}

#[test]
fn test_commands() {
    let options = EncodeOptions::default();
    assert_eq!(commands::encode_query("CONFIG?").unwrap(), b"CONFIG?\r\n".to_vec());
    assert_eq!(
        Command::ControlEscape(Escape::ReadyCheck).encode(&options).unwrap(),
        vec![0x1B, 0x21, 0x3F]
    );
    assert_eq!(
        Command::Query(Query::Battery).encode(&options).unwrap(),
        b"BATTERY?\r\n".to_vec()
    );
    assert!(matches!(
        commands::encode_query("VERSION?"),
        Err(NelkoError::UnsupportedQuery(_))
    ));
}

#[test]
fn test_unsupported_statements_rejected() {
    for line in ["QRCODE 10,10,L,5,A,0,\"x\"", "TEXT 10,10,\"3\",0,1,1,\"hi\"", "BOX 0,0,10,10,1"] {
        assert!(matches!(Statement::parse(line), Err(NelkoError::UnsupportedCommand(_))));
    }
}

#[test]
fn test_barcode_needs_opt_in() {
    let statement = Statement::parse("BARCODE 10,10,\"128\",48,1,0,2,2,\"P21\"").unwrap();
    let strict = tspl::encode_statements(&[statement.clone()], &EncodeOptions::default());
    assert!(matches!(strict, Err(NelkoError::UnsupportedCommand(_))));

    let lenient = EncodeOptions::default().best_effort_barcode(true);
    let bytes = tspl::encode_statements(&[statement], &lenient).unwrap();
    assert_eq!(bytes, b"BARCODE 10,10,\"128\",48,1,0,2,2,\"P21\"\r\n".to_vec());
}

#[test]
fn test_parsed_statements_encode_back() {
    let lines = [
        "SIZE 14.0 mm,40.0 mm",
        "GAP 5.0 mm,0.0 mm",
        "DIRECTION 0,1",
        "DENSITY 8",
        "CLS",
        "PRINT 2",
    ];
    let statements: Vec<Statement> = lines.iter().map(|l| Statement::parse(l).unwrap()).collect();
    let encoded = tspl::encode_statements(&statements, &EncodeOptions::default()).unwrap();
    assert_eq!(String::from_utf8(encoded).unwrap(), lines.join("\r\n") + "\r\n");
}

#[test]
fn test_rendered_pattern_job() {
    let img = patterns::diagonal_lines(96, 284, 4);
    let bitmap = render::bitmap_from_gray(&img, Dithering::Threshold, BitmapMode::Or);
    let job = PrintJob::bitmap(LabelSpec::p21_default(), bitmap);
    let encoded = tspl::encode_print_job(&job, &EncodeOptions::default()).unwrap();

    let (wb, h, _, offset) = tspl::find_bitmap_header(&encoded).unwrap();
    assert_eq!((wb, h), (12, 284));
    // Top-left dot sits on a line and prints: MSB cleared
    assert_eq!(encoded[offset] & 0x80, 0);
}

// ============================================================================
// DECODING
// ============================================================================

#[test]
fn test_decode_battery_capture() {
    assert_eq!(
        response::decode(b"BATTERY \x99\x00").unwrap(),
        DeviceStatus::Battery(BatteryStatus {
            percent_raw: 0x99,
            flag: 0x00
        })
    );
}

#[test]
fn test_decode_config_capture() {
    let status = response::decode(&config_reply()).unwrap();
    assert_eq!(
        status,
        DeviceStatus::Config(ConfigStatus {
            protocol: 0x00,
            dpi_code: 0xCB,
            hw_version: [0x00, 0x00, 0x03],
            fw_version: [0x04, 0x02, 0x04],
            reserved: [0x02, 0x01],
            trailer: [0x0D, 0x0A],
        })
    );

    let DeviceStatus::Config(config) = status else {
        unreachable!()
    };
    assert_eq!(config.dpi(), 203);
    assert_eq!(config.auto_off(), AutoOff::Minutes(30));
    assert_eq!(
        DeviceStatus::Config(config).to_string(),
        concat!(
            "DPI Resolution: 203\nHardware Version: 0.0.3\nFirmware Version: 4.2.4\n",
            "Timeout: 30 minutes\nBeep: On"
        )
    );
}

#[test]
fn test_truncated_config_is_incomplete() {
    let raw = config_reply();
    for len in 1..raw.len() {
        let result = response::decode(&raw[..len]);
        assert!(
            matches!(result, Err(NelkoError::IncompleteResponse { .. })),
            "{} bytes: {:?}",
            len,
            result
        );
    }
}

#[test]
fn test_wrong_prefix_is_malformed() {
    let mut raw = config_reply();
    raw[0] = b'X';
    assert!(matches!(response::decode(&raw), Err(NelkoError::MalformedResponse(_))));
}
