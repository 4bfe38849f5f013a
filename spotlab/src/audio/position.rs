//! Lock-free holder for the latest tracked position

use std::sync::atomic::{AtomicU64, Ordering};

/// Normalised horizontal position shared between the tracker and the audio
/// render thread.
///
/// Stores `x / frame_width` clamped to `[0, 1]` as raw `f64` bits, with NaN
/// meaning "no detection". Reads and writes are single atomic operations, so
/// the reader never sees a half-written value.
#[derive(Debug)]
pub struct TrackedPosition {
    bits: AtomicU64,
}

impl Default for TrackedPosition {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackedPosition {
    /// Starts with no position.
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(f64::NAN.to_bits()),
        }
    }

    /// Store a normalised position, or clear it with `None`.
    ///
    /// Values are clamped to `[0, 1]`. Non-finite values clear the position.
    pub fn set(&self, normalized: Option<f64>) {
        let value = match normalized {
            Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
            _ => f64::NAN,
        };
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Store `x / frame_width`. A zero width clears the position.
    pub fn set_pixel(&self, x: f64, frame_width: u32) {
        if frame_width == 0 {
            self.clear();
        } else {
            self.set(Some(x / frame_width as f64));
        }
    }

    pub fn clear(&self) {
        self.set(None);
    }

    /// Latest normalised position, if any.
    pub fn get(&self) -> Option<f64> {
        let value = f64::from_bits(self.bits.load(Ordering::Acquire));
        (!value.is_nan()).then_some(value)
    }
}
