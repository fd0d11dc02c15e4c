//! av-capture-probe - run a capture session against a device and report
//!
//! Drives the session the way a recorder would: a simulated video path
//! counts down skip frames and marks the first video frame, a consumer
//! drains frames as 16-bit PCM, and the session report is printed as JSON.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use av_capture_core::processing::sample_format::to_le_bytes;
use av_capture_core::{
    AudioCaptureSession, CaptureBackend, CaptureConfiguration, MonotonicClock, SessionHandle, SyntheticBackend,
    VideoClock, VideoLink,
};
use av_capture_cpal::CpalBackend;

#[derive(Parser)]
#[command(name = "av-capture-probe")]
#[command(about = "Capture audio in sync with a simulated video stream and print the session report")]
#[command(version)]
struct Cli {
    /// JSON capture configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input device id or name (overrides the configuration)
    #[arg(short, long)]
    device: Option<String>,

    /// Capture duration in seconds
    #[arg(short, long, default_value = "3")]
    seconds: f64,

    /// Use the sine generator instead of a hardware device
    #[arg(long)]
    synthetic: bool,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let backend: Box<dyn CaptureBackend> = if cli.synthetic {
        Box::new(SyntheticBackend::default())
    } else {
        Box::new(CpalBackend::new())
    };

    if cli.list_devices {
        let sources = backend.input_devices()?;
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => CaptureConfiguration::from_json_file(path)?,
        None => CaptureConfiguration::default(),
    };
    if cli.device.is_some() {
        config.device_id = cli.device.clone();
    }
    let video_period = Duration::from_nanos(config.video_frame_rate.period_ns());

    let clock = MonotonicClock::new();
    let video = Arc::new(VideoLink::new());
    let mut session = AudioCaptureSession::new(backend, clock.clone(), video.clone());

    let format = session
        .configure_for_device(config, None)
        .context("failed to configure audio capture")?;
    log::info!(
        "Capturing {} Hz, {} ch, {} ms frames for {:.1} s",
        format.sample_rate,
        format.channels,
        format.frame_duration_ns() / 1_000_000,
        cli.seconds
    );

    video.set_capturing(true);
    session.start().context("failed to start audio capture")?;

    let video_running = Arc::new(AtomicBool::new(true));
    let video_thread = spawn_video(
        session.handle(),
        Arc::clone(&video),
        clock,
        video_period,
        Arc::clone(&video_running),
    )?;

    let mut consumer = session.consumer();
    let deadline = Instant::now() + Duration::from_secs_f64(cli.seconds.max(0.0));
    let mut frames = 0u64;
    let mut bytes = 0usize;
    while Instant::now() < deadline {
        match consumer.try_consume_pcm16() {
            Some(frame) => {
                frames += 1;
                bytes += to_le_bytes(&frame.samples).len();
                log::debug!("frame {} at {} ns", frames, frame.timestamp_ns);
            }
            None => thread::sleep(Duration::from_millis(5)),
        }
    }

    video_running.store(false, Ordering::SeqCst);
    video.set_capturing(false);
    let _ = video_thread.join();

    let stop_result = session.stop();
    log::info!("Consumed {} frames ({} bytes of PCM)", frames, bytes);

    if let Some(report) = session.last_report() {
        println!("{}", report.to_json());
    }
    stop_result.context("audio stream did not stop cleanly")?;
    Ok(())
}

/// Simulated video path: discards the configured skip frames, then marks
/// the first video frame on the shared clock.
fn spawn_video(
    handle: SessionHandle,
    video: Arc<VideoLink>,
    clock: MonotonicClock,
    period: Duration,
    running: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("probe-video".into())
        .spawn(move || {
            while running.load(Ordering::SeqCst) {
                thread::sleep(period);
                if handle.skip_frames() > 0 {
                    let remaining = handle.frame_skipped();
                    log::debug!("Skipped video frame, {} to go", remaining);
                } else if video.mark_first_frame(clock.now_ns()) {
                    log::info!("First video frame at {} ns", video.reference_timestamp_ns());
                }
            }
        })
        .context("failed to spawn video thread")
}
