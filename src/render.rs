//! Scale bar rasterization.
//!
//! Draws a solid bar of known real-world length plus its text label onto a
//! copy of the image. Geometry is pixel-space: the bar length in pixels is
//! the micrometer length divided by the µm-per-pixel calibration. Anything
//! falling outside the image is clipped silently; an off-screen bar is
//! legal, just invisible.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;

/// Vertical gap between the bar's underside and the label's top edge.
const LABEL_GAP_PX: i32 = 5;

#[derive(Debug, Error)]
pub enum RenderError {
    /// µm-per-pixel must be strictly positive and finite before any
    /// geometry is computed.
    #[error("cannot place scale bar: um-per-pixel must be positive and finite, got {0}")]
    InvalidCalibration(f64),
}

/// Parameters of one render pass. Built fresh from the form every time.
#[derive(Debug, Clone)]
pub struct ScaleBarSpec {
    pub bar_length_um: f64,
    /// Top-left corner of the bar, image pixels.
    pub position: (i32, i32),
    pub thickness_px: u32,
    pub color: Rgba<u8>,
    pub label: String,
    pub font_size: f32,
    pub label_x_offset: i32,
}

/// Convert the bar's micrometer length into pixels.
pub fn bar_length_px(um_per_pixel: f64, bar_length_um: f64) -> Result<f64, RenderError> {
    if !um_per_pixel.is_finite() || um_per_pixel <= 0.0 {
        return Err(RenderError::InvalidCalibration(um_per_pixel));
    }
    Ok(bar_length_um / um_per_pixel)
}

/// Draw the bar and label onto a fresh copy of `image`.
///
/// The input buffer is never touched; callers keep it for re-rendering
/// with different parameters. `font` is the already-resolved label font;
/// `None` (no usable font on this system) drops the label but still draws
/// the bar.
pub fn render_scale_bar(
    image: &RgbaImage,
    um_per_pixel: f64,
    spec: &ScaleBarSpec,
    font: Option<&FontArc>,
) -> Result<RgbaImage, RenderError> {
    let length_px = bar_length_px(um_per_pixel, spec.bar_length_um)?.round();

    let mut out = image.clone();
    let (x, y) = spec.position;

    if length_px >= 1.0 && spec.thickness_px > 0 {
        let bar = Rect::at(x, y).of_size(length_px as u32, spec.thickness_px);
        draw_filled_rect_mut(&mut out, bar, spec.color);
    }

    if let Some(font) = font {
        if !spec.label.is_empty() {
            draw_text_mut(
                &mut out,
                spec.color,
                x + spec.label_x_offset,
                y + spec.thickness_px as i32 + LABEL_GAP_PX,
                PxScale::from(spec.font_size),
                font,
                &spec.label,
            );
        }
    }

    Ok(out)
}

/// Suggested name for the saved result, derived from the source image.
pub fn download_file_name(source: &Path, bar_length_um: f64) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    format!("{stem}_scalebar_{bar_length_um}um.tiff")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn spec(length_um: f64, position: (i32, i32), thickness: u32) -> ScaleBarSpec {
        ScaleBarSpec {
            bar_length_um: length_um,
            position,
            thickness_px: thickness,
            color: WHITE,
            label: String::new(),
            font_size: 20.0,
            label_x_offset: 0,
        }
    }

    #[test]
    fn unit_calibration_maps_microns_to_pixels() {
        assert_eq!(bar_length_px(1.0, 100.0).unwrap(), 100.0);
        assert_eq!(bar_length_px(0.5, 100.0).unwrap(), 200.0);
    }

    #[test]
    fn nikon_4x_bar_is_about_29_pixels() {
        let px = bar_length_px(3.41880341880341, 100.0).unwrap();
        assert_relative_eq!(px, 29.25, epsilon = 0.01);
    }

    #[test]
    fn non_positive_calibration_is_rejected() {
        assert!(matches!(
            bar_length_px(0.0, 100.0),
            Err(RenderError::InvalidCalibration(_))
        ));
        assert!(matches!(
            bar_length_px(-2.0, 100.0),
            Err(RenderError::InvalidCalibration(_))
        ));
        assert!(matches!(
            bar_length_px(f64::NAN, 100.0),
            Err(RenderError::InvalidCalibration(_))
        ));
    }

    #[test]
    fn render_with_bad_calibration_draws_nothing() {
        let image = RgbaImage::from_pixel(64, 64, BLACK);
        let result = render_scale_bar(&image, 0.0, &spec(100.0, (4, 4), 5), None);
        assert!(matches!(result, Err(RenderError::InvalidCalibration(_))));
        assert!(image.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn bar_covers_exactly_its_rectangle() {
        let image = RgbaImage::from_pixel(640, 480, BLACK);
        let out = render_scale_bar(&image, 1.0, &spec(100.0, (440, 430), 5), None).unwrap();

        // interior
        assert_eq!(*out.get_pixel(440, 430), WHITE);
        assert_eq!(*out.get_pixel(539, 434), WHITE);
        // just outside each edge
        assert_eq!(*out.get_pixel(439, 430), BLACK);
        assert_eq!(*out.get_pixel(540, 430), BLACK);
        assert_eq!(*out.get_pixel(440, 429), BLACK);
        assert_eq!(*out.get_pixel(440, 435), BLACK);
    }

    #[test]
    fn half_micron_calibration_doubles_the_bar() {
        let image = RgbaImage::from_pixel(400, 100, BLACK);
        let out = render_scale_bar(&image, 0.5, &spec(100.0, (50, 10), 3), None).unwrap();
        assert_eq!(*out.get_pixel(249, 10), WHITE);
        assert_eq!(*out.get_pixel(250, 10), BLACK);
    }

    #[test]
    fn input_image_is_not_mutated() {
        let image = RgbaImage::from_pixel(64, 64, BLACK);
        let _ = render_scale_bar(&image, 1.0, &spec(30.0, (0, 0), 5), None).unwrap();
        assert!(image.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn off_canvas_bar_clips_silently() {
        let image = RgbaImage::from_pixel(640, 480, BLACK);
        let out = render_scale_bar(&image, 1.0, &spec(100.0, (600, 470), 5), None).unwrap();
        assert_eq!(*out.get_pixel(639, 472), WHITE);
        assert_eq!(*out.get_pixel(599, 472), BLACK);

        // fully outside: nothing visible, no error
        let out = render_scale_bar(&image, 1.0, &spec(100.0, (700, 500), 5), None).unwrap();
        assert!(out.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn suggested_name_embeds_stem_and_length() {
        let path = PathBuf::from("/data/cells.png");
        assert_eq!(download_file_name(&path, 100.0), "cells_scalebar_100um.tiff");
        assert_eq!(
            download_file_name(&path, 62.5),
            "cells_scalebar_62.5um.tiff"
        );
        assert_eq!(
            download_file_name(Path::new("plate.ome.tif"), 25.0),
            "plate.ome_scalebar_25um.tiff"
        );
    }
}
