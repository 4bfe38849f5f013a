//! Frame analysis from the command line
//!
//! # Usage
//!
//! ```bash
//! # Centroid of the brightest blob
//! spotlab centroid frame.png
//! spotlab centroid frame.png --canny --lower 200
//!
//! # Gaussian fit, optionally saving an overlay
//! spotlab fit spot.png --bounded --overlay fit.png
//!
//! # All peaks above 3 sigma of a noise floor of 4 counts
//! spotlab peaks field.png --noise-sigma 4 --json
//!
//! # Geometry
//! spotlab rotate frame.png --angle 12.5 --crop-inscribed -o rotated.png
//! spotlab crop frame.png --width 256 --height 256 -o crop.png
//! spotlab colormap frame.png --colormap parula --upscale 4 -o false_colour.png
//!
//! # Two seconds of feedback tone for a spot at 30% of the frame width
//! spotlab tone --position 0.3 --seconds 2 -o tone.f32
//!
//! # Same tone through the speakers (needs the `playback` feature)
//! spotlab tone --position 0.3 --seconds 2 --play
//!
//! # Write the default settings, edit, then pass them back in
//! spotlab init-config spotlab.json
//! spotlab --config spotlab.json centroid frame.png
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use image::{DynamicImage, GrayImage, ImageBuffer, Pixel, PixelWithColorType};
use log::{info, warn};
use spotlab::audio::{ClockedDevice, SoundFeedback};
use spotlab::image_proc::{
    crop_around_center, describe_first_peak, find_centroid, find_peaks, fit_gaussian,
    gray_image_to_array, largest_rotated_rect, rotate_image, upscale_nearest, EdgeMode,
};
use spotlab::viz::{apply_colormap, render_fit_overlay, Colormap};
use spotlab::SpotlabConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON settings file; missing values use the built-in defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate the centroid of the largest bright blob
    Centroid {
        image: PathBuf,

        /// Lowest intensity counted as spot
        #[arg(long)]
        lower: Option<u8>,

        /// Highest intensity counted as spot
        #[arg(long)]
        upper: Option<u8>,

        /// Extract borders from a Canny edge map
        #[arg(long)]
        canny: bool,
    },

    /// Fit an isotropic Gaussian to the whole frame
    Fit {
        image: PathBuf,

        /// Keep parameters inside the frame
        #[arg(short, long)]
        bounded: bool,

        /// Save a colour-mapped overlay of the fit here
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// Colour map for the overlay: parula or grey
        #[arg(long, default_value = "parula")]
        colormap: Colormap,
    },

    /// List peaks above a multiple of the noise floor
    Peaks {
        image: PathBuf,

        /// Background noise standard deviation in counts
        #[arg(short = 's', long)]
        noise_sigma: f64,

        /// Threshold in units of noise sigma
        #[arg(short, long)]
        factor: Option<f64>,

        /// Half size of the suppression window
        #[arg(long)]
        half_size: Option<usize>,

        /// Print peaks as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rotate counter-clockwise about the centre
    Rotate {
        image: PathBuf,

        /// Angle in degrees
        #[arg(short, long, allow_hyphen_values = true)]
        angle: f64,

        /// Crop to the largest rectangle free of padding
        #[arg(long)]
        crop_inscribed: bool,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Crop around the frame centre
    Crop {
        image: PathBuf,

        #[arg(long)]
        width: u32,

        #[arg(long)]
        height: u32,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Render a frame through a colour map
    Colormap {
        image: PathBuf,

        #[arg(long, default_value = "parula")]
        colormap: Colormap,

        /// Integer nearest-neighbour upscale factor
        #[arg(long, default_value = "1")]
        upscale: usize,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Render the feedback tone to a raw little-endian f32 file
    Tone {
        /// Normalised horizontal position in [0, 1]
        #[arg(short, long, conflicts_with = "image")]
        position: Option<f64>,

        /// Take the position from the centroid in this frame instead
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Seconds of audio to render
        #[arg(long, default_value = "1.0")]
        seconds: f64,

        /// Output file; omit to only report what was rendered
        #[arg(short, long, conflicts_with = "play")]
        output: Option<PathBuf>,

        /// Play through the default audio output instead of rendering offline
        #[arg(long)]
        play: bool,
    },

    /// Write the default settings as JSON
    InitConfig { path: PathBuf },
}

fn load_gray(path: &Path) -> Result<GrayImage> {
    Ok(load_image(path)?.to_luma8())
}

fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("Failed to open image {}", path.display()))
}

fn save<P>(image: &ImageBuffer<P, Vec<u8>>, path: &Path) -> Result<()>
where
    P: PixelWithColorType<Subpixel = u8>,
{
    image
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Rotate, optionally cropping to the padding-free interior.
fn rotate_and_crop<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    angle: f64,
    crop_inscribed: bool,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8> + Send + Sync + 'static,
{
    let rotated = rotate_image(image, angle)?;
    if !crop_inscribed {
        return Ok(rotated);
    }
    let (w, h) = image.dimensions();
    let (iw, ih) = largest_rotated_rect(w as f64, h as f64, angle.to_radians())?;
    let cw = (iw.floor() as u32).max(1);
    let ch = (ih.floor() as u32).max(1);
    Ok(crop_around_center(&rotated, cw, ch)?)
}

/// Normalised position for the tone, either given directly or from the
/// centroid of a frame. `None` means no spot, which plays silence.
fn tone_position(
    config: &SpotlabConfig,
    position: Option<f64>,
    image: Option<PathBuf>,
) -> Result<Option<f64>> {
    match (position, image) {
        (Some(p), _) => {
            if !(0.0..=1.0).contains(&p) {
                warn!("Position {p} outside [0, 1] will be clamped");
            }
            Ok(Some(p))
        }
        (None, Some(path)) => {
            let frame = load_gray(&path)?;
            match find_centroid(&frame, &config.centroid) {
                Some(c) => {
                    println!("Spot at ({:.2}, {:.2})", c.x, c.y);
                    Ok(Some(c.x / frame.width() as f64))
                }
                None => {
                    println!("No spot found; rendering silence");
                    Ok(None)
                }
            }
        }
        (None, None) => bail!("tone needs --position or --image"),
    }
}

fn check_seconds(seconds: f64) -> Result<()> {
    if !seconds.is_finite() || seconds <= 0.0 {
        bail!("--seconds must be positive, got {seconds}");
    }
    Ok(())
}

#[cfg(feature = "playback")]
fn play_tone(config: &SpotlabConfig, position: Option<f64>, seconds: f64) -> Result<()> {
    use spotlab::audio::SystemOutput;

    check_seconds(seconds)?;
    let device = SystemOutput::open_default(&config.audio)?;
    let mut feedback = SoundFeedback::start(device, &config.audio)?;
    feedback.set_position(position);

    let frequency = feedback.position().unwrap_or(0.0) * config.audio.max_frequency_hz;
    println!("Playing {frequency:.1} Hz for {seconds:.2} s");
    std::thread::sleep(Duration::from_secs_f64(seconds));
    feedback.stop();
    Ok(())
}

#[cfg(not(feature = "playback"))]
fn play_tone(_config: &SpotlabConfig, _position: Option<f64>, _seconds: f64) -> Result<()> {
    bail!("spotlab was built without audio output; rebuild with `--features playback`")
}

fn run_tone(
    config: &SpotlabConfig,
    position: Option<f64>,
    seconds: f64,
    output: Option<PathBuf>,
) -> Result<()> {
    check_seconds(seconds)?;
    let audio = &config.audio;

    let (device, sink) = ClockedDevice::new(audio.clone())?;
    let feedback = SoundFeedback::start(device, audio)?;
    feedback.set_position(position);

    let total_frames = (seconds * audio.sample_rate as f64).ceil() as usize;
    let buffers = total_frames.div_ceil(audio.buffer_frames);
    let timeout = audio.buffer_period() * 4 + Duration::from_millis(500);

    let mut writer = match &output {
        Some(path) => Some(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create {}", path.display())
        })?)),
        None => None,
    };

    let mut peak = 0.0f32;
    for _ in 0..buffers {
        let Some(buffer) = sink.recv_timeout(timeout) else {
            bail!("audio render thread stopped delivering buffers");
        };
        peak = buffer.iter().fold(peak, |m, s| m.max(s.abs()));
        if let Some(w) = writer.as_mut() {
            for sample in &buffer {
                w.write_all(&sample.to_le_bytes())?;
            }
        }
        sink.recycle(buffer);
    }
    if let Some(mut w) = writer {
        w.flush()?;
    }

    let frequency = feedback.position().unwrap_or(0.0) * audio.max_frequency_hz;
    println!(
        "Rendered {buffers} buffers ({:.2} s) at {frequency:.1} Hz, peak {peak:.4}, {} underruns",
        (buffers * audio.buffer_frames) as f64 / audio.sample_rate as f64,
        feedback.device().underruns()
    );
    if let Some(path) = output {
        println!(
            "Wrote {} ({} ch interleaved f32 LE, {} Hz)",
            path.display(),
            audio.channels,
            audio.sample_rate
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SpotlabConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SpotlabConfig::default(),
    };

    match cli.command {
        Commands::Centroid {
            image,
            lower,
            upper,
            canny,
        } => {
            if let Some(lower) = lower {
                config.centroid.lower = lower;
            }
            if let Some(upper) = upper {
                config.centroid.upper = upper;
            }
            if canny {
                config.centroid.edge_mode = EdgeMode::canny();
            }

            let frame = load_gray(&image)?;
            match find_centroid(&frame, &config.centroid) {
                Some(c) => println!(
                    "Centroid at ({:.3}, {:.3}), area {:.1} px^2",
                    c.x, c.y, c.area
                ),
                None => println!("No spot found"),
            }
        }

        Commands::Fit {
            image,
            bounded,
            overlay,
            colormap,
        } => {
            let frame = gray_image_to_array(&load_gray(&image)?);
            let fit = fit_gaussian(&frame.view(), bounded, &config.gaussian_fit)
                .context("Gaussian fit failed")?;
            let p = fit.params;
            println!(
                "x0 = {:.3}, y0 = {:.3}, sigma = {:.3}, amplitude = {:.2}",
                p.x0, p.y0, p.sigma, p.amplitude
            );
            println!(
                "rms residual {:.4} after {} iterations",
                fit.rms_residual, fit.iterations
            );

            if let Some(path) = overlay {
                let rendered = render_fit_overlay(&frame.view(), &p, colormap)?;
                save(&rendered, &path)?;
            }
        }

        Commands::Peaks {
            image,
            noise_sigma,
            factor,
            half_size,
            json,
        } => {
            if let Some(factor) = factor {
                config.peaks.threshold_factor = factor;
            }
            if let Some(half_size) = half_size {
                config.peaks.exclusion_half_size = half_size;
            }

            let frame = gray_image_to_array(&load_gray(&image)?);
            let peaks = find_peaks(&frame.view(), noise_sigma, &config.peaks)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&peaks)?);
            } else {
                println!("Found {} peaks{}", peaks.len(), describe_first_peak(&peaks));
                for (i, peak) in peaks.iter().enumerate() {
                    println!(
                        "{i:5}: row {:5} col {:5} value {:.1}",
                        peak.row, peak.col, peak.value
                    );
                }
            }
        }

        Commands::Rotate {
            image,
            angle,
            crop_inscribed,
            output,
        } => {
            let source = load_image(&image)?;
            if source.color().has_color() {
                let rotated = rotate_and_crop(&source.to_rgb8(), angle, crop_inscribed)?;
                save(&rotated, &output)?;
            } else {
                let rotated = rotate_and_crop(&source.to_luma8(), angle, crop_inscribed)?;
                save(&rotated, &output)?;
            }
        }

        Commands::Crop {
            image,
            width,
            height,
            output,
        } => {
            let source = load_image(&image)?;
            if source.color().has_color() {
                save(&crop_around_center(&source.to_rgb8(), width, height)?, &output)?;
            } else {
                save(&crop_around_center(&source.to_luma8(), width, height)?, &output)?;
            }
        }

        Commands::Colormap {
            image,
            colormap,
            upscale,
            output,
        } => {
            let frame = gray_image_to_array(&load_gray(&image)?);
            let frame = upscale_nearest(&frame.view(), upscale)?;
            let rendered = apply_colormap(&frame.view(), colormap);
            save(&rendered, &output)?;
            println!("Rendered with {} colour map", colormap.name());
        }

        Commands::Tone {
            position,
            image,
            seconds,
            output,
            play,
        } => {
            let position = tone_position(&config, position, image)?;
            if play {
                play_tone(&config, position, seconds)?;
            } else {
                run_tone(&config, position, seconds, output)?;
            }
        }

        Commands::InitConfig { path } => {
            SpotlabConfig::default()
                .save_to_file(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote default settings to {}", path.display());
        }
    }

    Ok(())
}
