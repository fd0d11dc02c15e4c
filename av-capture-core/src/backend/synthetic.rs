//! Generator backend.
//!
//! Delivers a sine tone (or unreadable, silent blocks) at real-time pace
//! from a dedicated thread. Used for pipeline checks on machines without
//! capture hardware and as the reference `CaptureBackend` implementation.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::models::audio_models::{AudioSource, AudioTransportType, DeviceDefaults};
use crate::models::config::PCM_FRAME_SIZE;
use crate::models::error::CaptureError;
use crate::traits::capture_backend::{BlockSink, CaptureBackend, StreamControl, StreamParams};

pub const SYNTHETIC_DEVICE_ID: &str = "synthetic";

/// Sine-wave capture backend.
pub struct SyntheticBackend {
    defaults: DeviceDefaults,
    tone_hz: f32,
    amplitude: f32,
    silent: bool,
    stream: Option<(StreamParams, Arc<dyn BlockSink>)>,
    running: Arc<AtomicBool>,
    aborted: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    capture_handle: Option<thread::JoinHandle<()>>,
}

impl SyntheticBackend {
    pub fn new(defaults: DeviceDefaults) -> Self {
        Self {
            defaults,
            tone_hz: 440.0,
            amplitude: 0.5,
            silent: false,
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
            aborted: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicBool::new(false)),
            capture_handle: None,
        }
    }

    pub fn with_tone(mut self, tone_hz: f32, amplitude: f32) -> Self {
        self.tone_hz = tone_hz;
        self.amplitude = amplitude;
        self
    }

    /// Deliver every block without samples, as a device that drops reads.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    fn join_capture_thread(&mut self) {
        if let Some(handle) = self.capture_handle.take() {
            if handle.join().is_err() {
                log::error!("Synthetic capture thread panicked");
            }
        }
        self.active.store(false, Ordering::SeqCst);
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new(DeviceDefaults::default())
    }
}

impl CaptureBackend for SyntheticBackend {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn device_defaults(&self, device_id: Option<&str>) -> Result<DeviceDefaults, CaptureError> {
        match device_id {
            None | Some(SYNTHETIC_DEVICE_ID) => Ok(self.defaults),
            Some(other) => Err(CaptureError::DeviceNotAvailable(other.to_string())),
        }
    }

    fn input_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        Ok(vec![AudioSource {
            id: SYNTHETIC_DEVICE_ID.into(),
            name: "Synthetic Tone".into(),
            is_default: true,
            transport_type: Some(AudioTransportType::Virtual),
            defaults: self.defaults,
        }])
    }

    fn open(&mut self, params: &StreamParams, sink: Arc<dyn BlockSink>) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            return Err(CaptureError::StreamOpenFailed("stream already open".into()));
        }
        self.device_defaults(params.device_id.as_deref())?;
        if params.sample_rate == 0 || params.channels == 0 {
            return Err(CaptureError::StreamOpenFailed(format!(
                "invalid stream format: {} Hz, {} channels",
                params.sample_rate, params.channels
            )));
        }

        self.stream = Some((params.clone(), sink));
        Ok(())
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        let Some((params, sink)) = self.stream.as_ref() else {
            return Err(CaptureError::StreamStartFailed("stream not open".into()));
        };
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.running.store(true, Ordering::SeqCst);
        self.aborted.store(false, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);

        let generator = ToneGenerator {
            params: params.clone(),
            sink: Arc::clone(sink),
            tone_hz: self.tone_hz,
            amplitude: self.amplitude,
            silent: self.silent,
        };
        let running = Arc::clone(&self.running);
        let aborted = Arc::clone(&self.aborted);
        let active = Arc::clone(&self.active);

        let handle = thread::Builder::new()
            .name("synthetic-audio-capture".into())
            .spawn(move || {
                generator.run(&running, &aborted);
                active.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                self.active.store(false, Ordering::SeqCst);
                CaptureError::StreamStartFailed(format!("failed to spawn capture thread: {}", e))
            })?;

        self.capture_handle = Some(handle);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        self.join_capture_thread();
        Ok(())
    }

    fn abort(&mut self) -> Result<(), CaptureError> {
        self.aborted.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.join_capture_thread();
        Ok(())
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        if self.capture_handle.is_some() {
            self.abort()?;
        }
        self.stream = None;
        Ok(())
    }
}

impl Drop for SyntheticBackend {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

struct ToneGenerator {
    params: StreamParams,
    sink: Arc<dyn BlockSink>,
    tone_hz: f32,
    amplitude: f32,
    silent: bool,
}

impl ToneGenerator {
    fn run(&self, running: &AtomicBool, aborted: &AtomicBool) {
        let frames = self.params.frames_per_block.map_or(PCM_FRAME_SIZE, |f| f as usize);
        let channels = self.params.channels as usize;
        let sample_rate = self.params.sample_rate;
        let period = Duration::from_nanos(frames as u64 * 1_000_000_000 / sample_rate as u64);
        let step = TAU * self.tone_hz / sample_rate as f32;

        let mut block = vec![0.0f32; frames * channels];
        let mut phase = 0.0f32;
        let mut deadline = Instant::now() + period;

        while running.load(Ordering::SeqCst) {
            thread::sleep(deadline.saturating_duration_since(Instant::now()));
            deadline += period;
            if aborted.load(Ordering::SeqCst) {
                break;
            }

            for frame in block.chunks_exact_mut(channels) {
                frame.fill(self.amplitude * phase.sin());
                phase = (phase + step) % TAU;
            }

            let samples = if self.silent { None } else { Some(block.as_slice()) };
            if self.sink.on_block(samples, frames, self.params.clock.now_ns()) == StreamControl::Complete {
                log::debug!("Synthetic stream completed by callback");
                break;
            }
        }
    }
}
