//! System audio output through cpal
//!
//! Only built with the `playback` feature, since it links the platform audio
//! stack (ALSA on Linux).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig, SupportedBufferSize};
use log::{debug, info, warn};

use super::device::{AudioDevice, RenderCallback, StreamControl};
use super::{AudioConfig, AudioError};

/// The host's default output device, driven by cpal's pull callback.
///
/// cpal calls back on its own audio thread with an interleaved `f32` buffer,
/// which goes straight to the [`RenderCallback`]. Once the callback reports
/// [`StreamControl::Complete`] the stream plays silence until stopped.
pub struct SystemOutput {
    device: cpal::Device,
    stream_config: StreamConfig,
    stream: Option<cpal::Stream>,
    finished: Arc<AtomicBool>,
}

impl SystemOutput {
    /// Open the default output device with the rate, channel count and
    /// buffer size from `config`.
    pub fn open_default(config: &AudioConfig) -> Result<Self, AudioError> {
        config.validate()?;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::Backend(format!("failed to query output device: {e}")))?;

        let stream_config = stream_config(config, supported.buffer_size())?;
        info!(
            "Audio output on {} ({} Hz, {} ch, buffer {:?})",
            device.name().unwrap_or_else(|_| "unnamed device".to_string()),
            config.sample_rate,
            config.channels,
            stream_config.buffer_size
        );

        Ok(Self {
            device,
            stream_config,
            stream: None,
            finished: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// cpal stream settings for `config`.
///
/// The configured buffer length is requested when the device advertises a
/// range containing it; otherwise the device picks its own.
fn stream_config(
    config: &AudioConfig,
    supported: &SupportedBufferSize,
) -> Result<StreamConfig, AudioError> {
    let channels = u16::try_from(config.channels).map_err(|_| {
        AudioError::InvalidConfig(format!("{} output channels is too many", config.channels))
    })?;

    let buffer_size = match (u32::try_from(config.buffer_frames), supported) {
        (Ok(frames), SupportedBufferSize::Range { min, max })
            if (*min..=*max).contains(&frames) =>
        {
            BufferSize::Fixed(frames)
        }
        _ => {
            warn!(
                "Device cannot take {} frame buffers ({supported:?}); using its default",
                config.buffer_frames
            );
            BufferSize::Default
        }
    };

    Ok(StreamConfig {
        channels,
        sample_rate: SampleRate(config.sample_rate),
        buffer_size,
    })
}

impl AudioDevice for SystemOutput {
    fn start(&mut self, mut callback: Box<dyn RenderCallback>) -> Result<(), AudioError> {
        if self.is_running() {
            return Err(AudioError::AlreadyRunning);
        }
        self.stop();
        self.finished.store(false, Ordering::Release);

        let finished = self.finished.clone();
        let stream = self
            .device
            .build_output_stream(
                &self.stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if finished.load(Ordering::Acquire) {
                        data.fill(0.0);
                        return;
                    }
                    if callback.render(data) == StreamControl::Complete {
                        finished.store(true, Ordering::Release);
                    }
                },
                |err| warn!("Audio output stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::Backend(format!("failed to open output stream: {e}")))?;

        stream
            .play()
            .map_err(|e| AudioError::Backend(format!("failed to start output stream: {e}")))?;
        debug!("Audio output stream playing");

        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("Pausing output stream before close failed: {e}");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.stream.is_some() && !self.finished.load(Ordering::Acquire)
    }
}

impl Drop for SystemOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
