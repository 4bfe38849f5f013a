//! Fitted spot overlays

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use ndarray::ArrayView2;

use super::colormap::{apply_colormap, Colormap};
use super::{Result, VizError};
use crate::image_proc::GaussianParams;

/// Marker appearance for [`render_fit_overlay_styled`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    /// Half length of each stroke of the centre cross
    pub marker_half_size: f32,
    pub color: Rgb<u8>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            marker_half_size: 3.0,
            color: Rgb([255, 0, 0]),
        }
    }
}

/// Colour-mapped frame with a red `x` at the fitted centre and a circle of
/// radius sigma around it.
pub fn render_fit_overlay(
    frame: &ArrayView2<f64>,
    params: &GaussianParams,
    colormap: Colormap,
) -> Result<RgbImage> {
    render_fit_overlay_styled(frame, params, colormap, &OverlayStyle::default())
}

/// [`render_fit_overlay`] with explicit marker styling.
pub fn render_fit_overlay_styled(
    frame: &ArrayView2<f64>,
    params: &GaussianParams,
    colormap: Colormap,
    style: &OverlayStyle,
) -> Result<RgbImage> {
    let (height, width) = frame.dim();
    if width == 0 || height == 0 {
        return Err(VizError::EmptyImage { width, height });
    }
    if !(params.x0.is_finite() && params.y0.is_finite() && params.sigma.is_finite()) {
        return Err(VizError::InvalidOverlay(format!(
            "non-finite fit parameters {params:?}"
        )));
    }

    let mut img = apply_colormap(frame, colormap);

    let cx = params.x0 as f32;
    let cy = params.y0 as f32;
    let d = style.marker_half_size;
    draw_line_segment_mut(&mut img, (cx - d, cy - d), (cx + d, cy + d), style.color);
    draw_line_segment_mut(&mut img, (cx - d, cy + d), (cx + d, cy - d), style.color);

    let radius = params.sigma.abs().round() as i32;
    if radius > 0 {
        draw_hollow_circle_mut(
            &mut img,
            (params.x0.round() as i32, params.y0.round() as i32),
            radius,
            style.color,
        );
    }

    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);

    fn params(x0: f64, y0: f64, sigma: f64) -> GaussianParams {
        GaussianParams {
            x0,
            y0,
            sigma,
            amplitude: 1.0,
        }
    }

    #[test]
    fn test_marker_and_circle_drawn() {
        let frame = Array2::<f64>::zeros((40, 40));
        let img = render_fit_overlay(&frame.view(), &params(20.0, 20.0, 8.0), Colormap::Grey)
            .unwrap();

        assert_eq!(img.get_pixel(20, 20), &RED);
        assert_eq!(img.get_pixel(22, 22), &RED);
        assert_eq!(img.get_pixel(28, 20), &RED);
        assert_eq!(img.get_pixel(20, 12), &RED);
        // Between the cross and the circle
        assert_eq!(img.get_pixel(25, 20), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_marker_off_frame_is_clipped() {
        let frame = Array2::<f64>::zeros((10, 10));
        let img = render_fit_overlay(&frame.view(), &params(-50.0, 3.0, 2.0), Colormap::Grey)
            .unwrap();
        assert!(img.pixels().all(|p| *p != RED));
    }

    #[test]
    fn test_empty_and_nan_rejected() {
        let empty = Array2::<f64>::zeros((0, 0));
        assert!(matches!(
            render_fit_overlay(&empty.view(), &params(0.0, 0.0, 1.0), Colormap::Parula),
            Err(VizError::EmptyImage { .. })
        ));

        let frame = Array2::<f64>::zeros((5, 5));
        assert!(matches!(
            render_fit_overlay(&frame.view(), &params(f64::NAN, 0.0, 1.0), Colormap::Parula),
            Err(VizError::InvalidOverlay(_))
        ));
    }
}
