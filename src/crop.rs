//! Centered square cropping.
//!
//! The crop removes pixels along the horizontal axis only, matching the
//! tool this replaces: `side = min(width, height)` columns are kept,
//! nudged left or right by a bounded user offset, and every row survives.
//! For an image taller than wide `max_offset` is zero and the crop is a
//! no-op rather than producing a square. Flagged in DESIGN.md as a known
//! asymmetry awaiting product clarification; do not "fix" it here.

use image::{imageops, RgbaImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CropError {
    /// Offset must stay within `[-max_offset, +max_offset]`; the UI slider
    /// spans exactly that interval.
    #[error("crop offset {offset} exceeds the permitted ±{max_offset} range")]
    OffsetOutOfRange { offset: i32, max_offset: i32 },
}

/// Pixel rectangle selected by a crop, `right`/`bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRegion {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Largest horizontal nudge that keeps the square inside the image.
pub fn max_offset(width: u32, height: u32) -> u32 {
    let side = width.min(height);
    (width - side) / 2
}

/// Compute the square crop rectangle for the given horizontal offset.
pub fn square_crop_region(
    width: u32,
    height: u32,
    offset: i32,
) -> Result<CropRegion, CropError> {
    let max_offset = max_offset(width, height) as i32;
    if offset < -max_offset || offset > max_offset {
        return Err(CropError::OffsetOutOfRange { offset, max_offset });
    }

    let left = (max_offset + offset) as u32;
    let right = (width as i64 - max_offset as i64 + offset as i64) as u32;
    Ok(CropRegion {
        left,
        top: 0,
        right,
        bottom: height,
    })
}

/// Copy the crop rectangle out into a fresh buffer; the source is untouched.
pub fn crop_to_square(image: &RgbaImage, offset: i32) -> Result<RgbaImage, CropError> {
    let region = square_crop_region(image.width(), image.height(), offset)?;
    Ok(imageops::crop_imm(
        image,
        region.left,
        region.top,
        region.width(),
        region.height(),
    )
    .to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn centered_region_for_landscape_image() {
        let region = square_crop_region(1000, 600, 0).unwrap();
        assert_eq!(max_offset(1000, 600), 200);
        assert_eq!(
            region,
            CropRegion {
                left: 200,
                top: 0,
                right: 800,
                bottom: 600,
            }
        );
    }

    #[test]
    fn offset_shifts_the_window() {
        let region = square_crop_region(1000, 600, 50).unwrap();
        assert_eq!(
            region,
            CropRegion {
                left: 250,
                top: 0,
                right: 850,
                bottom: 600,
            }
        );

        let region = square_crop_region(1000, 600, -200).unwrap();
        assert_eq!(region.left, 0);
        assert_eq!(region.right, 600);
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        assert!(matches!(
            square_crop_region(1000, 600, 201),
            Err(CropError::OffsetOutOfRange { .. })
        ));
        assert!(matches!(
            square_crop_region(1000, 600, -201),
            Err(CropError::OffsetOutOfRange { .. })
        ));
    }

    #[test]
    fn crop_yields_min_dimension_square_for_landscape() {
        let source = RgbaImage::from_pixel(1000, 600, Rgba([10, 20, 30, 255]));
        for offset in [-200, -37, 0, 99, 200] {
            let cropped = crop_to_square(&source, offset).unwrap();
            assert_eq!(cropped.width(), 600);
            assert_eq!(cropped.height(), 600);
        }
        // source unchanged
        assert_eq!(source.width(), 1000);
    }

    #[test]
    fn crop_copies_the_right_columns() {
        let mut source = RgbaImage::from_pixel(8, 4, Rgba([0, 0, 0, 255]));
        source.put_pixel(2, 1, Rgba([255, 0, 0, 255]));

        // max_offset = 2; offset 0 keeps columns 2..6
        let cropped = crop_to_square(&source, 0).unwrap();
        assert_eq!(cropped.dimensions(), (4, 4));
        assert_eq!(*cropped.get_pixel(0, 1), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn portrait_image_passes_through_unchanged() {
        // Horizontal-axis-only behavior: taller-than-wide images keep
        // their full extent.
        let source = RgbaImage::from_pixel(600, 1000, Rgba([1, 2, 3, 255]));
        assert_eq!(max_offset(600, 1000), 0);
        let cropped = crop_to_square(&source, 0).unwrap();
        assert_eq!(cropped.dimensions(), (600, 1000));
        assert!(matches!(
            crop_to_square(&source, 1),
            Err(CropError::OffsetOutOfRange { .. })
        ));
    }

    #[test]
    fn square_image_is_a_no_op() {
        let source = RgbaImage::from_pixel(64, 64, Rgba([5, 5, 5, 255]));
        let cropped = crop_to_square(&source, 0).unwrap();
        assert_eq!(cropped.dimensions(), (64, 64));
    }
}
