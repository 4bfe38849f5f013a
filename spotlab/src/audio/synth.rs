//! Sine tone whose pitch follows the tracked position

use std::f64::consts::TAU;
use std::sync::Arc;

use super::device::{RenderCallback, StreamControl};
use super::position::TrackedPosition;
use super::{AudioConfig, AudioError};

/// Renders `amplitude * sin(phase)` on every channel, with frequency
/// `position * max_frequency_hz`. Nothing tracked renders silence and resets
/// the phase.
///
/// The position is read once per buffer and the phase carries over between
/// buffers, so pitch changes do not click.
pub struct ToneSynth {
    position: Arc<TrackedPosition>,
    sample_rate: f64,
    channels: usize,
    amplitude: f32,
    max_frequency_hz: f64,
    phase: f64,
}

impl ToneSynth {
    pub fn new(position: Arc<TrackedPosition>, config: &AudioConfig) -> Result<Self, AudioError> {
        config.validate()?;
        Ok(Self {
            position,
            sample_rate: config.sample_rate as f64,
            channels: config.channels,
            amplitude: config.amplitude,
            max_frequency_hz: config.max_frequency_hz,
            phase: 0.0,
        })
    }

    /// Frequency the next buffer will be rendered at.
    pub fn frequency_hz(&self) -> f64 {
        self.position
            .get()
            .map_or(0.0, |p| p * self.max_frequency_hz)
    }

    /// Current oscillator phase in radians, within `[0, 2 pi)`.
    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl RenderCallback for ToneSynth {
    fn render(&mut self, output: &mut [f32]) -> StreamControl {
        let Some(position) = self.position.get() else {
            output.fill(0.0);
            self.phase = 0.0;
            return StreamControl::Continue;
        };
        let step = TAU * position * self.max_frequency_hz / self.sample_rate;

        for frame in output.chunks_mut(self.channels) {
            let sample = self.amplitude * self.phase.sin() as f32;
            frame.fill(sample);
            self.phase = (self.phase + step) % TAU;
        }

        StreamControl::Continue
    }
}
