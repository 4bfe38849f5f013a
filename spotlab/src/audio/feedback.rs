//! Tracker-facing handle for audio feedback

use std::sync::Arc;

use log::debug;

use super::device::AudioDevice;
use super::position::TrackedPosition;
use super::synth::ToneSynth;
use super::{AudioConfig, AudioError};
use crate::image_proc::Centroid;

/// Plays a tone whose pitch tracks the spot's horizontal position.
///
/// The device is stopped when this is dropped.
pub struct SoundFeedback<D: AudioDevice> {
    position: Arc<TrackedPosition>,
    device: D,
}

impl<D: AudioDevice> SoundFeedback<D> {
    /// Start `device` rendering a [`ToneSynth`] fed by a fresh position.
    pub fn start(mut device: D, config: &AudioConfig) -> Result<Self, AudioError> {
        let position = Arc::new(TrackedPosition::new());
        let synth = ToneSynth::new(position.clone(), config)?;
        device.start(Box::new(synth))?;
        Ok(Self { position, device })
    }

    /// Feed the latest detection. `None` silences the tone.
    pub fn update(&self, centroid: Option<&Centroid>, frame_width: u32) {
        match centroid {
            Some(c) => self.position.set_pixel(c.x, frame_width),
            None => self.position.clear(),
        }
        debug!("Audio feedback position {:?}", self.position.get());
    }

    /// Set the normalised position directly, bypassing centroiding.
    pub fn set_position(&self, normalized: Option<f64>) {
        self.position.set(normalized);
    }

    pub fn position(&self) -> Option<f64> {
        self.position.get()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn stop(&mut self) {
        self.device.stop();
    }
}

impl<D: AudioDevice> Drop for SoundFeedback<D> {
    fn drop(&mut self) {
        self.device.stop();
    }
}
