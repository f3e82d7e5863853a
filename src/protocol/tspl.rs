//! # TSPL2 Statement Encoder
//!
//! The P21 firmware understands a fixed subset of TSPL2:
//!
//! | Statement | Format | Notes |
//! |-----------|--------|-------|
//! | SIZE | `SIZE w mm,h mm` | one decimal place |
//! | GAP | `GAP g mm,o mm` | one decimal place |
//! | DIRECTION | `DIRECTION 0,m` | m = 1 mirrors |
//! | DENSITY | `DENSITY n` | 0..=15 |
//! | CLS | `CLS` | clears the image buffer |
//! | BITMAP | `BITMAP x,y,wb,h,mode,<data>` | raw binary, length = wb × h |
//! | BAR | `BAR x,y,w,h` | solid black rectangle in dots |
//! | SELFTEST | `SELFTEST` | prints the self-test label |
//! | PRINT | `PRINT n` | n ≥ 1 copies |
//! | BARCODE | `BARCODE x,y,"type",h,r,rot,n,w,"data"` | best-effort only |
//!
//! Everything else (TEXT, QRCODE, BOX, ...) is rejected with
//! `UnsupportedCommand`: the firmware's handling of it is undefined.
//!
//! ## Print Job Layout
//!
//! ```text
//! SIZE 14.0 mm,40.0 mm\r\n
//! GAP 5.0 mm,0.0 mm\r\n
//! DIRECTION 0,0\r\n
//! DENSITY 15\r\n
//! CLS\r\n
//! BITMAP 0,0,12,284,1,<3408 raw bytes>\r\n
//! PRINT 1\r\n
//! ```
//!
//! The BITMAP payload is spliced in unescaped. The device reads exactly
//! `width_bytes * height` bytes after the last comma, so a payload containing
//! `\r\n` is harmless.

use std::fmt;

use crate::error::NelkoError;
use crate::job::{Bitmap, BitmapMode, Content, Direction, LabelSpec, MAX_DENSITY, PrintJob};
use crate::printer::PrinterConfig;
use crate::protocol::commands::LineEnding;

/// Encoder settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    pub line_ending: LineEnding,
    /// Allow BARCODE statements even though the firmware handles them unreliably
    pub best_effort_barcode: bool,
}

impl EncodeOptions {
    pub fn line_ending(mut self, ending: LineEnding) -> Self {
        self.line_ending = ending;
        self
    }

    pub fn best_effort_barcode(mut self, enabled: bool) -> Self {
        self.best_effort_barcode = enabled;
        self
    }
}

/// # BARCODE Parameters
///
/// Standard TSPL2 syntax. The P21 accepts the statement but output is
/// unpredictable, so encoding it requires `EncodeOptions::best_effort_barcode`.
#[derive(Debug, Clone, PartialEq)]
pub struct Barcode {
    pub x: u32,
    pub y: u32,
    /// Symbology name, e.g. `128` or `39`
    pub kind: String,
    pub height: u32,
    pub human_readable: u8,
    pub rotation: u16,
    pub narrow: u32,
    pub wide: u32,
    pub content: String,
}

/// One TSPL2 statement of the supported subset.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Size { width_mm: f32, height_mm: f32 },
    Gap { gap_mm: f32, offset_mm: f32 },
    Direction(Direction),
    Density(u8),
    Cls,
    Bitmap(Bitmap),
    Bar { x: u32, y: u32, width: u32, height: u32 },
    SelfTest,
    Print { copies: u32 },
    Barcode(Barcode),
}

impl Statement {
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::Size { .. } => "SIZE",
            Statement::Gap { .. } => "GAP",
            Statement::Direction(_) => "DIRECTION",
            Statement::Density(_) => "DENSITY",
            Statement::Cls => "CLS",
            Statement::Bitmap(_) => "BITMAP",
            Statement::Bar { .. } => "BAR",
            Statement::SelfTest => "SELFTEST",
            Statement::Print { .. } => "PRINT",
            Statement::Barcode(_) => "BARCODE",
        }
    }

    /// Parse one textual statement.
    ///
    /// BITMAP cannot be written as text (its payload is binary) and is
    /// rejected here; build `Statement::Bitmap` directly instead.
    ///
    /// ## Example
    ///
    /// ```
    /// use nelko::protocol::tspl::Statement;
    ///
    /// assert_eq!(Statement::parse("DENSITY 8").unwrap(), Statement::Density(8));
    /// assert!(Statement::parse("QRCODE 10,10,L,5,A,0,\"hi\"").is_err());
    /// ```
    pub fn parse(line: &str) -> Result<Self, NelkoError> {
        let line = line.trim();
        let (keyword, args) = match line.split_once(char::is_whitespace) {
            Some((k, a)) => (k, a.trim()),
            None => (line, ""),
        };
        let malformed = || NelkoError::UnsupportedCommand(format!("malformed statement: {}", line));

        match keyword.to_ascii_uppercase().as_str() {
            "SIZE" => {
                let [w, h] = fields::<2>(args).ok_or_else(malformed)?;
                Ok(Statement::Size {
                    width_mm: parse_mm(w).ok_or_else(malformed)?,
                    height_mm: parse_mm(h).ok_or_else(malformed)?,
                })
            }
            "GAP" => {
                let [g, o] = fields::<2>(args).ok_or_else(malformed)?;
                Ok(Statement::Gap {
                    gap_mm: parse_mm(g).ok_or_else(malformed)?,
                    offset_mm: parse_mm(o).ok_or_else(malformed)?,
                })
            }
            "DIRECTION" => {
                let mut parts = args.split(',').map(str::trim);
                let dir = parts.next().ok_or_else(malformed)?;
                let mirror = parts.next().unwrap_or("0");
                match (dir, mirror) {
                    ("0", "0") => Ok(Statement::Direction(Direction::Normal)),
                    ("0", "1") => Ok(Statement::Direction(Direction::Mirrored)),
                    _ => Err(NelkoError::UnsupportedCommand(format!(
                        "DIRECTION {} (only 0,0 and 0,1)",
                        args
                    ))),
                }
            }
            "DENSITY" => args.parse().map(Statement::Density).map_err(|_| malformed()),
            "CLS" if args.is_empty() => Ok(Statement::Cls),
            "SELFTEST" if args.is_empty() => Ok(Statement::SelfTest),
            "PRINT" => {
                // PRINT m[,n]: only the label count is modelled
                let copies = args.split(',').next().unwrap_or("").trim();
                copies
                    .parse()
                    .map(|copies| Statement::Print { copies })
                    .map_err(|_| malformed())
            }
            "BAR" => {
                let [x, y, w, h] = fields::<4>(args).ok_or_else(malformed)?;
                let num = |s: &str| s.parse::<u32>().map_err(|_| malformed());
                Ok(Statement::Bar {
                    x: num(x)?,
                    y: num(y)?,
                    width: num(w)?,
                    height: num(h)?,
                })
            }
            "BARCODE" => parse_barcode(args).ok_or_else(malformed).map(Statement::Barcode),
            "BITMAP" => Err(NelkoError::UnsupportedCommand(
                "BITMAP carries binary data and cannot be parsed from text".to_string(),
            )),
            _ => Err(NelkoError::UnsupportedCommand(keyword.to_string())),
        }
    }

    /// Textual part of the statement (the BITMAP header stops at the last comma).
    fn text(&self, options: &EncodeOptions) -> Result<String, NelkoError> {
        let text = match self {
            Statement::Size {
                width_mm,
                height_mm,
            } => {
                check_mm("width", *width_mm, true)?;
                check_mm("height", *height_mm, true)?;
                format!("SIZE {:.1} mm,{:.1} mm", width_mm, height_mm)
            }
            Statement::Gap { gap_mm, offset_mm } => {
                check_mm("gap", *gap_mm, false)?;
                check_mm("gap offset", *offset_mm, false)?;
                format!("GAP {:.1} mm,{:.1} mm", gap_mm, offset_mm)
            }
            Statement::Direction(direction) => {
                let mirror = match direction {
                    Direction::Normal => 0,
                    Direction::Mirrored => 1,
                };
                format!("DIRECTION 0,{}", mirror)
            }
            Statement::Density(n) => {
                if *n > MAX_DENSITY {
                    return Err(NelkoError::InvalidLabel(format!(
                        "density {} outside 0..={}",
                        n, MAX_DENSITY
                    )));
                }
                format!("DENSITY {}", n)
            }
            Statement::Cls => "CLS".to_string(),
            Statement::Bitmap(bitmap) => {
                bitmap.validate()?;
                bitmap_header(bitmap)
            }
            Statement::Bar {
                x,
                y,
                width,
                height,
            } => format!("BAR {},{},{},{}", x, y, width, height),
            Statement::SelfTest => "SELFTEST".to_string(),
            Statement::Print { copies } => {
                if *copies < 1 {
                    return Err(NelkoError::CopiesOutOfRange(*copies));
                }
                format!("PRINT {}", copies)
            }
            Statement::Barcode(barcode) => {
                if !options.best_effort_barcode {
                    return Err(NelkoError::UnsupportedCommand(
                        "BARCODE is best-effort only; enable it explicitly".to_string(),
                    ));
                }
                if barcode.content.contains('"') || barcode.kind.contains('"') {
                    return Err(NelkoError::UnsupportedCommand(
                        "BARCODE fields cannot contain quotes".to_string(),
                    ));
                }
                format!(
                    "BARCODE {},{},\"{}\",{},{},{},{},{},\"{}\"",
                    barcode.x,
                    barcode.y,
                    barcode.kind,
                    barcode.height,
                    barcode.human_readable,
                    barcode.rotation,
                    barcode.narrow,
                    barcode.wide,
                    barcode.content
                )
            }
        };
        Ok(text)
    }

    /// Append the encoded statement to `out`.
    pub fn encode_into(
        &self,
        out: &mut Vec<u8>,
        options: &EncodeOptions,
    ) -> Result<(), NelkoError> {
        let text = self.text(options)?;
        out.extend_from_slice(text.as_bytes());
        if let Statement::Bitmap(bitmap) = self {
            out.extend_from_slice(&bitmap.data);
        }
        out.extend_from_slice(options.line_ending.as_bytes());
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options = EncodeOptions::default().best_effort_barcode(true);
        match (self, self.text(&options)) {
            (Statement::Bitmap(bitmap), Ok(text)) => {
                write!(f, "{}<{} bytes>", text, bitmap.data.len())
            }
            (_, Ok(text)) => f.write_str(&text),
            (_, Err(e)) => write!(f, "{} <invalid: {}>", self.keyword(), e),
        }
    }
}

fn bitmap_header(bitmap: &Bitmap) -> String {
    format!(
        "BITMAP {},{},{},{},{},",
        bitmap.x,
        bitmap.y,
        bitmap.width_bytes,
        bitmap.height_px,
        bitmap.mode.code()
    )
}

fn fields<const N: usize>(args: &str) -> Option<[&str; N]> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    parts.try_into().ok()
}

/// SIZE dimensions must be positive, GAP values non-negative.
fn check_mm(name: &str, value: f32, positive: bool) -> Result<(), NelkoError> {
    if !value.is_finite() {
        return Err(NelkoError::InvalidLabel(format!("{} is not finite", name)));
    }
    if value < 0.0 || (positive && value == 0.0) {
        return Err(NelkoError::InvalidLabel(format!("{} out of range: {} mm", name, value)));
    }
    Ok(())
}

fn parse_mm(field: &str) -> Option<f32> {
    let value = field.trim().trim_end_matches("mm").trim();
    value.parse::<f32>().ok().filter(|v| v.is_finite())
}

fn parse_barcode(args: &str) -> Option<Barcode> {
    // x,y,"type",height,human_readable,rotation,narrow,wide,"content"
    let (head, content) = args.rsplit_once(",\"")?;
    let content = content.strip_suffix('"')?;
    let [x, y, kind, height, human, rotation, narrow, wide] = fields::<8>(head)?;
    Some(Barcode {
        x: x.parse().ok()?,
        y: y.parse().ok()?,
        kind: kind.trim_matches('"').to_string(),
        height: height.parse().ok()?,
        human_readable: human.parse().ok()?,
        rotation: rotation.parse().ok()?,
        narrow: narrow.parse().ok()?,
        wide: wide.parse().ok()?,
        content: content.to_string(),
    })
}

// ============================================================================
// BATCH ENCODING
// ============================================================================

/// Encode a statement batch. Nothing is returned unless every statement is valid.
pub fn encode_statements(
    statements: &[Statement],
    options: &EncodeOptions,
) -> Result<Vec<u8>, NelkoError> {
    let mut out = Vec::new();
    for statement in statements {
        statement.encode_into(&mut out, options)?;
    }
    Ok(out)
}

/// SIZE, GAP, DIRECTION, DENSITY, CLS for a label.
pub fn preamble(label: &LabelSpec) -> [Statement; 5] {
    [
        Statement::Size {
            width_mm: label.width_mm,
            height_mm: label.height_mm,
        },
        Statement::Gap {
            gap_mm: label.gap_mm,
            offset_mm: label.gap_offset_mm,
        },
        Statement::Direction(label.direction),
        Statement::Density(label.density),
        Statement::Cls,
    ]
}

/// BAR statement covering the whole label.
pub fn black_bar(label: &LabelSpec, config: &PrinterConfig) -> Statement {
    Statement::Bar {
        x: 0,
        y: 0,
        width: config.mm_to_dots(label.width_mm),
        height: config.mm_to_dots(label.height_mm),
    }
}

fn check_job(job: &PrintJob) -> Result<(), NelkoError> {
    if job.copies < 1 {
        return Err(NelkoError::CopiesOutOfRange(job.copies));
    }
    if let Content::Bitmap(bitmap) = &job.content {
        bitmap.validate()?;
    }
    job.label.validate()
}

/// Statement list for a print job, in wire order.
pub fn job_statements(job: PrintJob) -> Result<Vec<Statement>, NelkoError> {
    check_job(&job)?;
    let mut statements = preamble(&job.label).to_vec();
    statements.push(match job.content {
        Content::Bitmap(bitmap) => Statement::Bitmap(bitmap),
        Content::BlackBar => black_bar(&job.label, &PrinterConfig::P21),
    });
    statements.push(Statement::Print { copies: job.copies });
    Ok(statements)
}

/// # Encode a Print Job
///
/// Emits the preamble, the content (BITMAP with raw payload, or a
/// full-label BAR), then `PRINT <copies>`.
///
/// ## Errors
///
/// - `CopiesOutOfRange` if `copies < 1`
/// - `InvalidGeometry` if the bitmap data length is not `width_bytes * height_px`
/// - `InvalidLabel` if the label geometry or density is out of range
///
/// ## Example
///
/// ```
/// use nelko::job::{Bitmap, LabelSpec, PrintJob};
/// use nelko::protocol::tspl::{self, EncodeOptions};
///
/// let job = PrintJob::bitmap(LabelSpec::p21_default(), Bitmap::new(12, 284, vec![0; 3408]));
/// let bytes = tspl::encode_print_job(&job, &EncodeOptions::default()).unwrap();
/// assert!(bytes.starts_with(b"SIZE 14.0 mm,40.0 mm\r\n"));
/// assert!(bytes.ends_with(b"PRINT 1\r\n"));
/// ```
pub fn encode_print_job(job: &PrintJob, options: &EncodeOptions) -> Result<Vec<u8>, NelkoError> {
    check_job(job)?;

    let mut out = Vec::with_capacity(128 + bitmap_len(&job.content));
    for statement in preamble(&job.label) {
        statement.encode_into(&mut out, options)?;
    }
    match &job.content {
        Content::Bitmap(bitmap) => {
            out.extend_from_slice(bitmap_header(bitmap).as_bytes());
            out.extend_from_slice(&bitmap.data);
            out.extend_from_slice(options.line_ending.as_bytes());
        }
        Content::BlackBar => {
            black_bar(&job.label, &PrinterConfig::P21).encode_into(&mut out, options)?
        }
    }
    Statement::Print { copies: job.copies }.encode_into(&mut out, options)?;
    Ok(out)
}

fn bitmap_len(content: &Content) -> usize {
    match content {
        Content::Bitmap(bitmap) => bitmap.data.len(),
        Content::BlackBar => 0,
    }
}

/// Locate the BITMAP header in an encoded job and return
/// `(width_bytes, height, mode, payload_offset)`.
///
/// Used to read a job back: the payload is the `width_bytes * height` bytes
/// starting at `payload_offset`.
pub fn find_bitmap_header(encoded: &[u8]) -> Option<(u32, u32, BitmapMode, usize)> {
    let start = encoded.windows(7).position(|w| w == b"BITMAP ")?;
    let mut commas = 0;
    let mut end = None;
    for (i, &byte) in encoded[start..].iter().enumerate() {
        if byte == b',' {
            commas += 1;
            if commas == 5 {
                end = Some(start + i);
                break;
            }
        }
    }
    let end = end?;
    let header = std::str::from_utf8(&encoded[start + 7..end]).ok()?;
    let [_, _, width_bytes, height, mode] = fields::<5>(header)?;
    Some((
        width_bytes.parse().ok()?,
        height.parse().ok()?,
        BitmapMode::from_code(mode.parse().ok()?)?,
        end + 1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(statement: Statement) -> Vec<u8> {
        encode_statements(&[statement], &EncodeOptions::default()).unwrap()
    }

    #[test]
    fn test_size_and_gap_one_decimal() {
        assert_eq!(
            encode(Statement::Size {
                width_mm: 14.0,
                height_mm: 40.0
            }),
            b"SIZE 14.0 mm,40.0 mm\r\n".to_vec()
        );
        assert_eq!(
            encode(Statement::Gap {
                gap_mm: 5.0,
                offset_mm: 0.0
            }),
            b"GAP 5.0 mm,0.0 mm\r\n".to_vec()
        );
        assert_eq!(
            encode(Statement::Size {
                width_mm: 12.34,
                height_mm: 30.0
            }),
            b"SIZE 12.3 mm,30.0 mm\r\n".to_vec()
        );
    }

    #[test]
    fn test_direction_and_density() {
        assert_eq!(encode(Statement::Direction(Direction::Normal)), b"DIRECTION 0,0\r\n".to_vec());
        assert_eq!(
            encode(Statement::Direction(Direction::Mirrored)),
            b"DIRECTION 0,1\r\n".to_vec()
        );
        assert_eq!(encode(Statement::Density(15)), b"DENSITY 15\r\n".to_vec());
        assert_eq!(encode(Statement::Density(0)), b"DENSITY 0\r\n".to_vec());
    }

    #[test]
    fn test_density_out_of_range() {
        let result = encode_statements(&[Statement::Density(16)], &EncodeOptions::default());
        assert!(matches!(result, Err(NelkoError::InvalidLabel(_))));
    }

    #[test]
    fn test_size_and_gap_out_of_range() {
        let bad = [
            Statement::Size {
                width_mm: f32::NAN,
                height_mm: 40.0,
            },
            Statement::Size {
                width_mm: 14.0,
                height_mm: 0.0,
            },
            Statement::Size {
                width_mm: -5.0,
                height_mm: 40.0,
            },
            Statement::Gap {
                gap_mm: -1.0,
                offset_mm: 0.0,
            },
            Statement::Gap {
                gap_mm: 5.0,
                offset_mm: f32::INFINITY,
            },
        ];
        for statement in bad {
            let result = encode_statements(&[statement.clone()], &EncodeOptions::default());
            assert!(matches!(result, Err(NelkoError::InvalidLabel(_))), "{:?}", statement);
        }

        let parsed = Statement::parse("SIZE -5 mm,0 mm").unwrap();
        assert!(matches!(
            encode_statements(&[parsed], &EncodeOptions::default()),
            Err(NelkoError::InvalidLabel(_))
        ));
    }

    #[test]
    fn test_print_zero_copies_rejected() {
        let result =
            encode_statements(&[Statement::Print { copies: 0 }], &EncodeOptions::default());
        assert!(matches!(result, Err(NelkoError::CopiesOutOfRange(0))));
    }

    #[test]
    fn test_bitmap_statement_payload_is_raw() {
        let bitmap = Bitmap::new(2, 1, vec![b'\r', b'\n']).mode(BitmapMode::Xor).at(3, 4);
        assert_eq!(encode(Statement::Bitmap(bitmap)), b"BITMAP 3,4,2,1,2,\r\n\r\n".to_vec());
    }

    #[test]
    fn test_barcode_requires_opt_in() {
        let barcode = Statement::parse("BARCODE 10,10,\"128\",48,1,0,2,2,\"ABC\"").unwrap();
        let result = encode_statements(std::slice::from_ref(&barcode), &EncodeOptions::default());
        assert!(matches!(result, Err(NelkoError::UnsupportedCommand(_))));

        let opts = EncodeOptions::default().best_effort_barcode(true);
        assert_eq!(
            encode_statements(&[barcode], &opts).unwrap(),
            b"BARCODE 10,10,\"128\",48,1,0,2,2,\"ABC\"\r\n".to_vec()
        );
    }

    #[test]
    fn test_parse_subset() {
        assert_eq!(
            Statement::parse("SIZE 14.0 mm,40.0 mm").unwrap(),
            Statement::Size {
                width_mm: 14.0,
                height_mm: 40.0
            }
        );
        assert_eq!(
            Statement::parse("GAP 5 mm,0 mm").unwrap(),
            Statement::Gap {
                gap_mm: 5.0,
                offset_mm: 0.0
            }
        );
        assert_eq!(
            Statement::parse("direction 0,1").unwrap(),
            Statement::Direction(Direction::Mirrored)
        );
        assert_eq!(Statement::parse("CLS").unwrap(), Statement::Cls);
        assert_eq!(Statement::parse("SELFTEST").unwrap(), Statement::SelfTest);
        assert_eq!(Statement::parse("PRINT 3,1").unwrap(), Statement::Print { copies: 3 });
        assert_eq!(
            Statement::parse("BAR 0,0,112,320").unwrap(),
            Statement::Bar {
                x: 0,
                y: 0,
                width: 112,
                height: 320
            }
        );
    }

    #[test]
    fn test_parse_rejects_outside_subset() {
        for line in [
            "TEXT 10,10,\"3\",0,1,1,\"hi\"",
            "QRCODE 1,1,L,3,A,0,\"x\"",
            "BOX 0,0,10,10,1",
        ] {
            assert!(
                matches!(Statement::parse(line), Err(NelkoError::UnsupportedCommand(_))),
                "{} should be rejected",
                line
            );
        }
        assert!(Statement::parse("BITMAP 0,0,1,1,0,").is_err());
        assert!(Statement::parse("DIRECTION 1,0").is_err());
        assert!(Statement::parse("SIZE 14.0 mm").is_err());
    }

    #[test]
    fn test_black_bar_job() {
        let job = PrintJob::black_bar(LabelSpec::p21_default());
        let bytes = encode_print_job(&job, &EncodeOptions::default()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            concat!(
                "SIZE 14.0 mm,40.0 mm\r\nGAP 5.0 mm,0.0 mm\r\nDIRECTION 0,0\r\nDENSITY 15\r\n",
                "CLS\r\nBAR 0,0,112,320\r\nPRINT 1\r\n"
            )
        );
    }

    #[test]
    fn test_job_statements_match_encoding() {
        let bitmap = Bitmap::new(1, 2, vec![0x0F, 0xF0]);
        let job = PrintJob::bitmap(LabelSpec::p21_default(), bitmap).copies(2);
        let opts = EncodeOptions::default();
        let direct = encode_print_job(&job, &opts).unwrap();
        let via_statements = encode_statements(&job_statements(job).unwrap(), &opts).unwrap();
        assert_eq!(direct, via_statements);
    }

    #[test]
    fn test_lf_line_ending() {
        let opts = EncodeOptions::default().line_ending(LineEnding::Lf);
        let job = PrintJob::bitmap(LabelSpec::p21_default(), Bitmap::new(1, 1, vec![0xAA]));
        let bytes = encode_print_job(&job, &opts).unwrap();
        assert!(bytes.starts_with(b"SIZE 14.0 mm,40.0 mm\nGAP"));
        assert!(bytes.ends_with(b"BITMAP 0,0,1,1,1,\xAA\nPRINT 1\n"));
    }

    #[test]
    fn test_find_bitmap_header() {
        let job = PrintJob::bitmap(LabelSpec::p21_default(), Bitmap::new(12, 284, vec![0; 3408]));
        let bytes = encode_print_job(&job, &EncodeOptions::default()).unwrap();
        let (width_bytes, height, mode, offset) = find_bitmap_header(&bytes).unwrap();
        assert_eq!((width_bytes, height, mode), (12, 284, BitmapMode::Or));
        assert_eq!(&bytes[offset - 20..offset], b"BITMAP 0,0,12,284,1,");
        assert!(bytes[offset..offset + 3408].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_display_statement() {
        assert_eq!(Statement::Density(3).to_string(), "DENSITY 3");
        let bitmap = Statement::Bitmap(Bitmap::new(1, 2, vec![0, 0]));
        assert_eq!(bitmap.to_string(), "BITMAP 0,0,1,2,1,<2 bytes>");
    }
}
