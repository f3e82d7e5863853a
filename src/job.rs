//! # Print Job Model
//!
//! Caller-constructed values describing one label print:
//!
//! - [`LabelSpec`]: physical label geometry and print settings
//! - [`Bitmap`]: a monochrome raster placed on the label
//! - [`PrintJob`]: label + content + copy count, consumed once by the session
//!
//! The device keeps DIRECTION/DENSITY between jobs, so every job carries its
//! full preamble. A `PrintJob` is moved into [`Session::print`] and cannot be
//! resent; build a new one for the next print.
//!
//! [`Session::print`]: crate::session::Session::print

use crate::error::NelkoError;
use crate::printer::PrinterConfig;

/// Highest density level the P21 accepts.
pub const MAX_DENSITY: u8 = 15;

/// Print direction relative to the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Normal,
    Mirrored,
}

/// Physical label geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelSpec {
    pub width_mm: f32,
    pub height_mm: f32,
    pub gap_mm: f32,
    pub gap_offset_mm: f32,
    pub direction: Direction,
    /// Darkness, 0..=15
    pub density: u8,
}

impl LabelSpec {
    /// Label of the given size with no gap, normal direction and full density.
    pub fn new(width_mm: f32, height_mm: f32) -> Self {
        Self {
            width_mm,
            height_mm,
            gap_mm: 0.0,
            gap_offset_mm: 0.0,
            direction: Direction::Normal,
            density: MAX_DENSITY,
        }
    }

    /// The stock P21 label: 14 x 40 mm with a 5 mm gap.
    pub fn p21_default() -> Self {
        let config = PrinterConfig::P21;
        Self::new(config.label_width_mm, config.label_height_mm).gap(config.label_gap_mm, 0.0)
    }

    pub fn gap(mut self, gap_mm: f32, offset_mm: f32) -> Self {
        self.gap_mm = gap_mm;
        self.gap_offset_mm = offset_mm;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn density(mut self, density: u8) -> Self {
        self.density = density;
        self
    }

    /// Check the geometry invariants.
    ///
    /// Width and height must be positive, gap and offset non-negative, all
    /// finite, and density within `0..=15`.
    pub fn validate(&self) -> Result<(), NelkoError> {
        let dims = [
            ("width", self.width_mm),
            ("height", self.height_mm),
            ("gap", self.gap_mm),
            ("gap offset", self.gap_offset_mm),
        ];
        for (name, value) in dims {
            if !value.is_finite() {
                return Err(NelkoError::InvalidLabel(format!("{} is not finite", name)));
            }
        }
        if self.width_mm <= 0.0 || self.height_mm <= 0.0 {
            return Err(NelkoError::InvalidLabel(format!(
                "dimensions must be positive, got {} x {} mm",
                self.width_mm, self.height_mm
            )));
        }
        if self.gap_mm < 0.0 || self.gap_offset_mm < 0.0 {
            return Err(NelkoError::InvalidLabel("gap must not be negative".to_string()));
        }
        if self.density > MAX_DENSITY {
            return Err(NelkoError::InvalidLabel(format!(
                "density {} outside 0..={}",
                self.density, MAX_DENSITY
            )));
        }
        Ok(())
    }
}

impl Default for LabelSpec {
    fn default() -> Self {
        Self::p21_default()
    }
}

/// How BITMAP data combines with what is already in the image buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitmapMode {
    Overwrite,
    #[default]
    Or,
    Xor,
}

impl BitmapMode {
    /// Mode field of the BITMAP statement.
    pub fn code(self) -> u8 {
        match self {
            BitmapMode::Overwrite => 0,
            BitmapMode::Or => 1,
            BitmapMode::Xor => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(BitmapMode::Overwrite),
            1 => Some(BitmapMode::Or),
            2 => Some(BitmapMode::Xor),
            _ => None,
        }
    }
}

/// # Monochrome Raster
///
/// Row-major, MSB first, `width_bytes` bytes per row. In TSPL2 polarity a set
/// bit leaves the dot blank and a cleared bit prints it, so an all-zero
/// bitmap is solid black.
///
/// `data.len()` must equal `width_bytes * height_px`; this is checked when
/// the job is encoded, not at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub x: u32,
    pub y: u32,
    pub width_bytes: u32,
    pub height_px: u32,
    pub mode: BitmapMode,
    pub data: Vec<u8>,
}

impl Bitmap {
    pub fn new(width_bytes: u32, height_px: u32, data: Vec<u8>) -> Self {
        Self {
            x: 0,
            y: 0,
            width_bytes,
            height_px,
            mode: BitmapMode::default(),
            data,
        }
    }

    /// All-white raster of the given size.
    pub fn blank(width_bytes: u32, height_px: u32) -> Self {
        let len = width_bytes as usize * height_px as usize;
        Self::new(width_bytes, height_px, vec![0xFF; len])
    }

    pub fn at(mut self, x: u32, y: u32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn mode(mut self, mode: BitmapMode) -> Self {
        self.mode = mode;
        self
    }

    /// Width in dots.
    pub fn width_px(&self) -> u32 {
        self.width_bytes * 8
    }

    /// Payload length implied by the declared dimensions.
    pub fn expected_len(&self) -> usize {
        self.width_bytes as usize * self.height_px as usize
    }

    pub fn validate(&self) -> Result<(), NelkoError> {
        let expected = self.expected_len();
        if expected != self.data.len() {
            return Err(NelkoError::InvalidGeometry {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Whether the dot at (x, y) prints black.
    pub fn is_black(&self, x: u32, y: u32) -> bool {
        if x >= self.width_px() || y >= self.height_px {
            return false;
        }
        let idx = (y * self.width_bytes + x / 8) as usize;
        match self.data.get(idx) {
            Some(byte) => byte & (0x80 >> (x % 8)) == 0,
            None => false,
        }
    }
}

/// What gets printed on the label.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Bitmap(Bitmap),
    /// Fully inked label, no raster data
    BlackBar,
}

/// One print submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintJob {
    pub label: LabelSpec,
    pub content: Content,
    pub copies: u32,
}

impl PrintJob {
    pub fn new(label: LabelSpec, content: Content, copies: u32) -> Self {
        Self {
            label,
            content,
            copies,
        }
    }

    pub fn bitmap(label: LabelSpec, bitmap: Bitmap) -> Self {
        Self::new(label, Content::Bitmap(bitmap), 1)
    }

    pub fn black_bar(label: LabelSpec) -> Self {
        Self::new(label, Content::BlackBar, 1)
    }

    pub fn copies(mut self, copies: u32) -> Self {
        self.copies = copies;
        self
    }
}
