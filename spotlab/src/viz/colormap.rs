//! Scalar to colour mapping

use image::{Rgb, RgbImage};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::parula::PARULA;

/// Available colour maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Colormap {
    /// Perceptually ordered blue to yellow map used on the lab displays
    #[default]
    Parula,
    Grey,
}

impl Colormap {
    /// Colour for a normalised value.
    ///
    /// `t` is clamped to `[0, 1]`; NaN maps to the low end.
    pub fn map(&self, t: f64) -> Rgb<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Colormap::Grey => {
                let v = (t * 255.0).round() as u8;
                Rgb([v, v, v])
            }
            Colormap::Parula => {
                let pos = t * (PARULA.len() - 1) as f64;
                let lo = pos.floor() as usize;
                let hi = (lo + 1).min(PARULA.len() - 1);
                let frac = (pos - lo as f64) as f32;
                let mut out = [0u8; 3];
                for (c, slot) in out.iter_mut().enumerate() {
                    let v = PARULA[lo][c] * (1.0 - frac) + PARULA[hi][c] * frac;
                    *slot = (v * 255.0).round().clamp(0.0, 255.0) as u8;
                }
                Rgb(out)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Colormap::Parula => "parula",
            Colormap::Grey => "grey",
        }
    }
}

impl std::str::FromStr for Colormap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parula" => Ok(Colormap::Parula),
            "grey" | "gray" => Ok(Colormap::Grey),
            other => Err(format!("unknown colormap '{other}'")),
        }
    }
}

/// Render a frame through a colour map.
///
/// Values are stretched so the frame minimum maps to 0 and the maximum to 1.
/// A flat frame renders entirely at the low end.
pub fn apply_colormap(frame: &ArrayView2<f64>, colormap: Colormap) -> RgbImage {
    let (height, width) = frame.dim();
    let (min, max) = frame
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    let scale = if range.is_finite() && range > 0.0 {
        1.0 / range
    } else {
        0.0
    };

    RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let v = frame[[y as usize, x as usize]];
        colormap.map((v - min) * scale)
    })
}
