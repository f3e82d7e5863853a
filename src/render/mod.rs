//! # Rendering Module
//!
//! Converts images and test patterns into TSPL2 [`Bitmap`]s.
//!
//! ## Modules
//!
//! - [`dither`]: threshold and Bayer 8x8 binary conversion
//! - [`patterns`]: alignment and coverage test patterns
//!
//! ## Usage Example
//!
//! ```
//! use nelko::job::BitmapMode;
//! use nelko::render::{self, patterns, Dithering};
//!
//! let img = patterns::diagonal_lines(96, 284, 4);
//! let bitmap = render::bitmap_from_gray(&img, Dithering::Threshold, BitmapMode::Or);
//! assert_eq!(bitmap.width_bytes, 12);
//! assert_eq!(bitmap.data.len(), 12 * 284);
//! ```

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use log::debug;

use crate::error::NelkoError;
use crate::job::{Bitmap, BitmapMode};

pub mod dither;
pub mod patterns;

pub use dither::Dithering;

/// Convert a grayscale image (0 = black) to a bitmap, one dot per pixel.
///
/// Rows are padded to whole bytes with blank dots.
pub fn bitmap_from_gray(img: &GrayImage, dithering: Dithering, mode: BitmapMode) -> Bitmap {
    let (width, height) = img.dimensions();
    let data = dither::generate_raster(
        width as usize,
        height as usize,
        |x, y, _w, _h| {
            let pixel = img.get_pixel(x as u32, y as u32);
            1.0 - (pixel[0] as f32 / 255.0)
        },
        dithering,
    );
    Bitmap::new(width.div_ceil(8), height, data).mode(mode)
}

/// Scale an image to fit inside `width` x `height` and centre it on white.
pub fn fit_to_label(img: &DynamicImage, width: u32, height: u32) -> GrayImage {
    let resized = img.resize(width, height, FilterType::Triangle).to_luma8();
    let mut canvas = GrayImage::from_pixel(width, height, Luma([255]));
    let left = (width - resized.width()) / 2;
    let top = (height - resized.height()) / 2;
    imageops::overlay(&mut canvas, &resized, left as i64, top as i64);
    canvas
}

/// Open an image file and fit it to the label raster.
pub fn load_image<P: AsRef<Path>>(
    path: P,
    width: u32,
    height: u32,
) -> Result<GrayImage, NelkoError> {
    let path = path.as_ref();
    let img = image::open(path)?;
    debug!(
        "Loaded {} ({}x{}), fitting to {}x{}",
        path.display(),
        img.width(),
        img.height(),
        width,
        height
    );
    Ok(fit_to_label(&img, width, height))
}

/// Render a bitmap back to grayscale for previews.
pub fn to_gray(bitmap: &Bitmap) -> GrayImage {
    GrayImage::from_fn(bitmap.width_px(), bitmap.height_px, |x, y| {
        if bitmap.is_black(x, y) { Luma([0]) } else { Luma([255]) }
    })
}
