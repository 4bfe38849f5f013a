//! Audible feedback for the tracked spot position.
//!
//! The latest horizontal position lives in a lock-free [`TrackedPosition`].
//! A [`ToneSynth`] reads it once per buffer and renders a sine whose pitch is
//! proportional to the position. An [`AudioDevice`] pulls buffers from the
//! synth on its own thread: [`ClockedDevice`] in software, or the system
//! output with the `playback` feature.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod device;
pub mod feedback;
#[cfg(feature = "playback")]
pub mod playback;
pub mod position;
pub mod synth;

pub use device::{AudioDevice, BufferSink, ClockedDevice, RenderCallback, StreamControl};
pub use feedback::SoundFeedback;
#[cfg(feature = "playback")]
pub use playback::SystemOutput;
pub use position::TrackedPosition;
pub use synth::ToneSynth;

/// Errors from the audio feedback path
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("audio device is already running")]
    AlreadyRunning,

    #[error("invalid audio configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn audio render thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("no audio output device available")]
    NoOutputDevice,

    #[error("audio backend error: {0}")]
    Backend(String),
}

/// Output stream and tone settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Interleaved output channels
    pub channels: usize,
    /// Frames per rendered buffer
    pub buffer_frames: usize,
    /// Peak sample value of the tone
    pub amplitude: f32,
    /// Tone frequency at the right edge of the frame
    pub max_frequency_hz: f64,
    /// Buffers in flight between the render thread and the consumer
    pub queue_depth: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            buffer_frames: 4096,
            amplitude: 0.025,
            max_frequency_hz: 4400.0,
            queue_depth: 4,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<(), AudioError> {
        if self.sample_rate == 0 {
            return Err(AudioError::InvalidConfig(
                "sample rate must be positive".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(AudioError::InvalidConfig(
                "need at least one channel".to_string(),
            ));
        }
        if self.buffer_frames == 0 {
            return Err(AudioError::InvalidConfig(
                "buffer must hold at least one frame".to_string(),
            ));
        }
        if self.queue_depth == 0 {
            return Err(AudioError::InvalidConfig(
                "queue depth must be at least one".to_string(),
            ));
        }
        if !self.amplitude.is_finite() || !self.max_frequency_hz.is_finite() {
            return Err(AudioError::InvalidConfig(
                "amplitude and frequency must be finite".to_string(),
            ));
        }
        if self.max_frequency_hz < 0.0 || self.max_frequency_hz > self.sample_rate as f64 / 2.0 {
            return Err(AudioError::InvalidConfig(format!(
                "max frequency {} Hz outside [0, Nyquist = {} Hz]",
                self.max_frequency_hz,
                self.sample_rate as f64 / 2.0
            )));
        }
        Ok(())
    }

    /// Interleaved samples per buffer
    pub fn samples_per_buffer(&self) -> usize {
        self.buffer_frames * self.channels
    }

    /// Wall-clock duration of one buffer
    pub fn buffer_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.buffer_frames as f64 / self.sample_rate as f64)
    }
}
