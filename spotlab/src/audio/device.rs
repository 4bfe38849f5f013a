//! Pull-based audio output on a dedicated render thread
//!
//! [`ClockedDevice`] stands in for a sound card: once per buffer period it
//! asks the callback for a buffer and hands it to a [`BufferSink`]. Buffers
//! are allocated once up front and cycle between the render thread and the
//! consumer, so steady-state rendering never allocates.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, warn};

use super::{AudioConfig, AudioError};

/// What the device should do after a render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    Continue,
    /// The callback has nothing more to play; the device stops pulling.
    Complete,
}

/// Fills output buffers on the device's render thread.
///
/// Implementations run on a real-time sensitive thread: they must not block,
/// allocate or perform I/O.
pub trait RenderCallback: Send + 'static {
    /// Fill `output` with interleaved samples.
    fn render(&mut self, output: &mut [f32]) -> StreamControl;
}

/// An output device that drives a [`RenderCallback`].
pub trait AudioDevice {
    /// Start pulling buffers from `callback` on a background thread.
    fn start(&mut self, callback: Box<dyn RenderCallback>) -> Result<(), AudioError>;

    /// Stop pulling and wait for the render thread to exit. Idempotent.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

#[derive(Debug, Default)]
struct DeviceCounters {
    rendered: AtomicU64,
    underruns: AtomicU64,
}

/// Consumer end of a [`ClockedDevice`].
///
/// Receive filled buffers and hand them back with [`BufferSink::recycle`]
/// once played. Holding on to buffers starves the render thread.
pub struct BufferSink {
    filled: Receiver<Vec<f32>>,
    free: Sender<Vec<f32>>,
}

impl BufferSink {
    /// Next filled buffer, waiting at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Vec<f32>> {
        self.filled.recv_timeout(timeout).ok()
    }

    /// Next filled buffer if one is ready.
    pub fn try_recv(&self) -> Option<Vec<f32>> {
        self.filled.try_recv().ok()
    }

    /// Return a played buffer to the render thread.
    pub fn recycle(&self, buffer: Vec<f32>) {
        // Pool full only if foreign buffers were pushed in; dropping is fine.
        let _ = self.free.try_send(buffer);
    }
}

/// Software device that renders at the configured sample rate.
pub struct ClockedDevice {
    config: AudioConfig,
    filled_tx: Sender<Vec<f32>>,
    free_tx: Sender<Vec<f32>>,
    free_rx: Receiver<Vec<f32>>,
    counters: Arc<DeviceCounters>,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ClockedDevice {
    /// Create a stopped device and the sink its buffers arrive on.
    pub fn new(config: AudioConfig) -> Result<(Self, BufferSink), AudioError> {
        config.validate()?;

        let depth = config.queue_depth;
        let (filled_tx, filled_rx) = bounded(depth);
        let (free_tx, free_rx) = bounded(depth);
        for _ in 0..depth {
            // Cannot fail: the pool has exactly `depth` slots.
            let _ = free_tx.try_send(vec![0.0f32; config.samples_per_buffer()]);
        }

        let sink = BufferSink {
            filled: filled_rx,
            free: free_tx.clone(),
        };

        Ok((
            Self {
                config,
                filled_tx,
                free_tx,
                free_rx,
                counters: Arc::new(DeviceCounters::default()),
                stop_flag: Arc::new(AtomicBool::new(false)),
                worker: None,
            },
            sink,
        ))
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Buffers handed to the sink so far.
    pub fn buffers_rendered(&self) -> u64 {
        self.counters.rendered.load(Ordering::Relaxed)
    }

    /// Periods where no buffer could be rendered or delivered.
    pub fn underruns(&self) -> u64 {
        self.counters.underruns.load(Ordering::Relaxed)
    }

    fn render_loop(
        mut callback: Box<dyn RenderCallback>,
        period: Duration,
        filled_tx: Sender<Vec<f32>>,
        free_tx: Sender<Vec<f32>>,
        free_rx: Receiver<Vec<f32>>,
        counters: Arc<DeviceCounters>,
        stop_flag: Arc<AtomicBool>,
    ) {
        let mut deadline = Instant::now();

        while !stop_flag.load(Ordering::Acquire) {
            let Ok(mut buffer) = free_rx.try_recv() else {
                counters.underruns.fetch_add(1, Ordering::Relaxed);
                deadline += period;
                sleep_until(deadline);
                continue;
            };

            let control = callback.render(&mut buffer);

            match filled_tx.try_send(buffer) {
                Ok(()) => {
                    counters.rendered.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Full(buffer)) | Err(TrySendError::Disconnected(buffer)) => {
                    counters.underruns.fetch_add(1, Ordering::Relaxed);
                    let _ = free_tx.try_send(buffer);
                }
            }

            if control == StreamControl::Complete {
                debug!("Render callback completed, stopping audio thread");
                break;
            }

            deadline += period;
            sleep_until(deadline);
        }
    }
}

fn sleep_until(deadline: Instant) {
    let now = Instant::now();
    if deadline > now {
        thread::sleep(deadline - now);
    }
}

impl AudioDevice for ClockedDevice {
    fn start(&mut self, callback: Box<dyn RenderCallback>) -> Result<(), AudioError> {
        if self.is_running() {
            return Err(AudioError::AlreadyRunning);
        }
        // Reap a thread that finished on its own
        self.stop();
        self.stop_flag.store(false, Ordering::Release);

        let period = self.config.buffer_period();
        let filled_tx = self.filled_tx.clone();
        let free_tx = self.free_tx.clone();
        let free_rx = self.free_rx.clone();
        let counters = self.counters.clone();
        let stop_flag = self.stop_flag.clone();

        let handle = thread::Builder::new()
            .name("spotlab-audio".to_string())
            .spawn(move || {
                Self::render_loop(
                    callback, period, filled_tx, free_tx, free_rx, counters, stop_flag,
                )
            })
            .map_err(AudioError::Spawn)?;

        debug!(
            "Audio device started: {} Hz, {} ch, {} frames per buffer",
            self.config.sample_rate, self.config.channels, self.config.buffer_frames
        );
        self.worker = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("Audio render thread panicked");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ClockedDevice {
    fn drop(&mut self) {
        self.stop();

        let underruns = self.underruns();
        if underruns > 0 {
            warn!(
                "ClockedDevice: {underruns} underrun(s) over {} rendered buffer(s)",
                self.buffers_rendered()
            );
        }
    }
}
