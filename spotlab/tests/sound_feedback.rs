//! Audio feedback driven by detected centroids

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use spotlab::audio::{
    AudioConfig, AudioDevice, BufferSink, ClockedDevice, SoundFeedback, TrackedPosition,
};
use spotlab::image_proc::{find_centroid, CentroidConfig};
use test_helpers::disc_image;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn test_config() -> AudioConfig {
    AudioConfig {
        buffer_frames: 2048,
        ..Default::default()
    }
}

/// Frequency from upward zero crossings of the left channel.
fn left_channel_frequency(buffer: &[f32], sample_rate: f64) -> f64 {
    let left: Vec<f32> = buffer.iter().step_by(2).copied().collect();
    let crossings: Vec<usize> = left
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] <= 0.0 && w[1] > 0.0)
        .map(|(i, _)| i)
        .collect();
    assert!(crossings.len() >= 2, "not enough cycles to measure");
    let span = (crossings[crossings.len() - 1] - crossings[0]) as f64;
    (crossings.len() - 1) as f64 * sample_rate / span
}

/// First buffer containing sound, recycling everything received.
fn next_audible(sink: &BufferSink) -> Vec<f32> {
    for _ in 0..50 {
        let buffer = sink
            .recv_timeout(Duration::from_secs(2))
            .expect("audio thread stopped delivering");
        if buffer.iter().any(|&s| s != 0.0) {
            return buffer;
        }
        sink.recycle(buffer);
    }
    panic!("no audible buffer arrived");
}

#[test]
fn test_tone_follows_detected_spot() {
    init_logging();
    let config = test_config();
    let (device, sink) = ClockedDevice::new(config.clone()).unwrap();
    let feedback = SoundFeedback::start(device, &config).unwrap();
    assert!(feedback.device().is_running());

    let frame = disc_image(640, 120, 160.0, 60.0, 8.0, 0, 255);
    let centroid = find_centroid(&frame, &CentroidConfig::default());
    assert!(centroid.is_some());
    feedback.update(centroid.as_ref(), frame.width());

    let position = feedback.position().unwrap();
    assert!((position - 0.25).abs() < 0.01);

    let buffer = next_audible(&sink);
    assert_eq!(buffer.len(), config.samples_per_buffer());
    let measured = left_channel_frequency(&buffer, config.sample_rate as f64);
    let expected = position * config.max_frequency_hz;
    assert!(
        (measured - expected).abs() < 10.0,
        "measured {measured:.1} Hz, expected {expected:.1} Hz"
    );
}

#[test]
fn test_lost_spot_goes_silent() {
    init_logging();
    let config = test_config();
    let (device, sink) = ClockedDevice::new(config.clone()).unwrap();
    let feedback = SoundFeedback::start(device, &config).unwrap();

    let frame = disc_image(200, 100, 150.0, 50.0, 5.0, 0, 255);
    feedback.update(find_centroid(&frame, &CentroidConfig::default()).as_ref(), 200);
    let audible = next_audible(&sink);
    sink.recycle(audible);

    let blank = image::GrayImage::new(200, 100);
    feedback.update(find_centroid(&blank, &CentroidConfig::default()).as_ref(), 200);
    assert_eq!(feedback.position(), None);

    // Drain anything rendered before the update, then expect silence
    let mut silent = false;
    for _ in 0..20 {
        let buffer = sink.recv_timeout(Duration::from_secs(2)).unwrap();
        let quiet = buffer.iter().all(|&s| s == 0.0);
        sink.recycle(buffer);
        if quiet {
            silent = true;
            break;
        }
    }
    assert!(silent);
}

#[test]
fn test_tracked_position_never_tears() {
    let position = Arc::new(TrackedPosition::new());
    let done = Arc::new(AtomicBool::new(false));
    let values = [0.1f64, 0.123456789, 0.987654321];

    let writer = {
        let position = position.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut i = 0usize;
            while !done.load(Ordering::Relaxed) {
                match i % 4 {
                    3 => position.set(None),
                    k => position.set(Some(values[k])),
                }
                i += 1;
            }
        })
    };

    for _ in 0..200_000 {
        if let Some(v) = position.get() {
            assert!(values.contains(&v), "torn read {v}");
        }
    }
    done.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}
