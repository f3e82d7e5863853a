//! Test patterns for checking alignment and printhead coverage.
//!
//! Patterns are produced as grayscale images (0 = black, 255 = white) so they
//! go through the same [`bitmap_from_gray`](super::bitmap_from_gray) path as
//! photos.

use image::{GrayImage, Luma};

const BLACK: Luma<u8> = Luma([0]);
const WHITE: Luma<u8> = Luma([255]);

/// Names accepted by [`by_name`].
pub const PATTERNS: &[&str] = &["diagonal", "checker", "border"];

/// List all available pattern names.
pub fn list_patterns() -> &'static [&'static str] {
    PATTERNS
}

/// Look up a pattern by name (case insensitive).
pub fn by_name(name: &str, width: u32, height: u32) -> Option<GrayImage> {
    match name.to_ascii_lowercase().as_str() {
        "diagonal" | "diagonal_lines" => Some(diagonal_lines(width, height, 4)),
        "checker" | "checkerboard" => Some(checkerboard(width, height, 8)),
        "border" => Some(border(width, height, 2)),
        _ => None,
    }
}

/// 45° lines, one every `spacing` dots along each edge.
pub fn diagonal_lines(width: u32, height: u32, spacing: u32) -> GrayImage {
    let spacing = spacing.max(1);
    GrayImage::from_fn(width, height, |x, y| {
        if (x + y) % spacing == 0 { BLACK } else { WHITE }
    })
}

pub fn checkerboard(width: u32, height: u32, cell: u32) -> GrayImage {
    let cell = cell.max(1);
    GrayImage::from_fn(width, height, |x, y| {
        if (x / cell + y / cell) % 2 == 0 { BLACK } else { WHITE }
    })
}

/// Frame of `thickness` dots around the edge.
pub fn border(width: u32, height: u32, thickness: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let edge = x < thickness
            || y < thickness
            || x + thickness >= width
            || y + thickness >= height;
        if edge { BLACK } else { WHITE }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_patterns() {
        let patterns = list_patterns();
        assert!(patterns.contains(&"diagonal"));
        assert_eq!(patterns.len(), 3);
    }

    #[test]
    fn test_by_name() {
        assert!(by_name("diagonal", 96, 284).is_some());
        assert!(by_name("CHECKER", 96, 284).is_some());
        assert!(by_name("ripple", 96, 284).is_none());
    }

    #[test]
    fn test_diagonal_lines() {
        let img = diagonal_lines(48, 284, 4);
        assert_eq!(img.dimensions(), (48, 284));
        assert_eq!(img.get_pixel(0, 0), &BLACK);
        assert_eq!(img.get_pixel(1, 3), &BLACK);
        assert_eq!(img.get_pixel(1, 1), &WHITE);
    }

    #[test]
    fn test_border() {
        let img = border(10, 10, 1);
        assert_eq!(img.get_pixel(0, 5), &BLACK);
        assert_eq!(img.get_pixel(9, 9), &BLACK);
        assert_eq!(img.get_pixel(5, 5), &WHITE);
    }
}
