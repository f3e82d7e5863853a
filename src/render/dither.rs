//! # Binary Conversion
//!
//! The P21 printhead is 1 bit per dot. Grayscale input is reduced with
//! either a plain threshold or Bayer 8x8 ordered dithering.
//!
//! ## The Bayer Matrix
//!
//! ```text
//!     0   1   2   3   4   5   6   7   (x mod 8)
//!   ┌───┬───┬───┬───┬───┬───┬───┬───┐
//! 0 │ 0 │32 │ 8 │40 │ 2 │34 │10 │42 │
//! 1 │48 │16 │56 │24 │50 │18 │58 │26 │
//! 2 │12 │44 │ 4 │36 │14 │46 │ 6 │38 │
//! 3 │60 │28 │52 │20 │62 │30 │54 │22 │
//! 4 │ 3 │35 │11 │43 │ 1 │33 │ 9 │41 │
//! 5 │51 │19 │59 │27 │49 │17 │57 │25 │
//! 6 │15 │47 │ 7 │39 │13 │45 │ 5 │37 │
//! 7 │63 │31 │55 │23 │61 │29 │53 │21 │
//!   └───┴───┴───┴───┴───┴───┴───┴───┘
//! (y mod 8)
//! ```
//!
//! Values are normalised to (0, 1) with `(value + 0.5) / 64.0`.
//!
//! ## TSPL2 Polarity
//!
//! BITMAP data is inverted relative to most raster formats:
//!
//! | Bit | Dot |
//! |-----|-----|
//! | 1 | blank |
//! | 0 | printed |
//!
//! An all-zero payload prints a solid black label. [`pack_row`] takes
//! `true` = printed and emits TSPL2 polarity; padding bits are blank.
//!
//! ## Usage Example
//!
//! ```
//! use nelko::render::dither::{self, Dithering};
//!
//! let row = [true, true, false, false, true, false, true, false];
//! assert_eq!(dither::pack_row(&row), vec![0b0011_0101]);
//!
//! assert!(Dithering::Bayer.should_print(3, 5, 1.0));
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::NelkoError;

/// Bayer 8x8 dithering matrix (values 0-63, each once).
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Fixed cut-off used by [`Dithering::Threshold`].
pub const THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dithering {
    /// Print every dot darker than 50 %. Best for line art and text.
    Threshold,
    /// Ordered dithering. Best for photos.
    #[default]
    Bayer,
}

impl Dithering {
    /// Whether the dot at `(x, y)` prints for `intensity` (0.0 = white, 1.0 = black).
    #[inline]
    pub fn should_print(self, x: usize, y: usize, intensity: f32) -> bool {
        match self {
            Dithering::Threshold => intensity > THRESHOLD,
            Dithering::Bayer => intensity > bayer_threshold(x, y),
        }
    }
}

impl FromStr for Dithering {
    type Err = NelkoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "threshold" => Ok(Dithering::Threshold),
            "bayer" | "ordered" => Ok(Dithering::Bayer),
            other => Err(NelkoError::Image(format!("Unknown dithering: {}", other))),
        }
    }
}

impl fmt::Display for Dithering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dithering::Threshold => f.write_str("threshold"),
            Dithering::Bayer => f.write_str("bayer"),
        }
    }
}

/// Bayer threshold for a pixel position, in (0, 1).
///
/// Black (1.0) always prints and white (0.0) never does.
#[inline]
pub fn bayer_threshold(x: usize, y: usize) -> f32 {
    let matrix_value = BAYER8[y & 7][x & 7];
    (matrix_value as f32 + 0.5) / 64.0
}

/// Pack a row of dots (`true` = printed) into TSPL2 bytes, MSB first.
///
/// ```
/// use nelko::render::dither::pack_row;
///
/// // 12 printed dots: 8 in the first byte, 4 plus 4 blank padding bits
/// assert_eq!(pack_row(&[true; 12]), vec![0x00, 0x0F]);
/// ```
pub fn pack_row(dots: &[bool]) -> Vec<u8> {
    let num_bytes = dots.len().div_ceil(8);
    let mut bytes = vec![0xFFu8; num_bytes];

    for (i, &printed) in dots.iter().enumerate() {
        if printed {
            let bit_idx = 7 - (i % 8);
            bytes[i / 8] &= !(1 << bit_idx);
        }
    }

    bytes
}

/// Generate a packed raster from an intensity function.
///
/// Returns `ceil(width / 8) * height` bytes in TSPL2 polarity.
///
/// ```
/// use nelko::render::dither::{generate_raster, Dithering};
///
/// let data = generate_raster(96, 284, |x, _y, w, _h| x as f32 / w as f32, Dithering::Bayer);
/// assert_eq!(data.len(), 12 * 284);
/// ```
pub fn generate_raster<F>(
    width: usize,
    height: usize,
    intensity_fn: F,
    dithering: Dithering,
) -> Vec<u8>
where
    F: Fn(usize, usize, usize, usize) -> f32,
{
    let width_bytes = width.div_ceil(8);
    let mut data = Vec::with_capacity(width_bytes * height);
    let mut row = Vec::with_capacity(width);

    for y in 0..height {
        row.clear();
        for x in 0..width {
            let intensity = intensity_fn(x, y, width, height);
            row.push(dithering.should_print(x, y, intensity));
        }
        data.extend(pack_row(&row));
    }

    data
}
