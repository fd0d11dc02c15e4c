//! cpal input stream backend.
//!
//! cpal streams are not `Send`, so the stream is built, played and dropped
//! on a dedicated thread. The backend talks to that thread over two
//! crossbeam channels: a one-shot ready reply carrying the build/play
//! result, and a control channel carrying stop/abort.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use av_capture_core::models::audio_models::{AudioSource, DeviceDefaults};
use av_capture_core::models::error::CaptureError;
use av_capture_core::traits::capture_backend::{BlockSink, CaptureBackend, StreamControl, StreamParams};

use crate::device;

/// How long `start` waits for the stream thread to report.
const START_TIMEOUT: Duration = Duration::from_secs(5);

/// Scratch capacity (frames) when the caller gives no block size hint.
const DEFAULT_SCRATCH_FRAMES: usize = 4096;

enum Command {
    /// Pause, letting the block in flight finish, then drop the stream.
    Stop,
    /// Drop the stream immediately.
    Abort,
}

struct StreamWorker {
    control: Sender<Command>,
    capture_handle: thread::JoinHandle<()>,
}

/// cpal capture backend.
///
/// Supports `f32`, `i16` and `u16` device formats; integer samples are
/// converted to normalized `f32` before reaching the sink.
pub struct CpalBackend {
    host_id: cpal::HostId,
    stream: Option<(StreamParams, Arc<dyn BlockSink>)>,
    worker: Option<StreamWorker>,
    active: Arc<AtomicBool>,
}

impl CpalBackend {
    /// Backend on the platform's default host.
    pub fn new() -> Self {
        Self::with_host(cpal::default_host().id())
    }

    /// Backend on a specific host (e.g. JACK instead of ALSA).
    pub fn with_host(host_id: cpal::HostId) -> Self {
        Self {
            host_id,
            stream: None,
            worker: None,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    fn host(&self) -> Result<cpal::Host, CaptureError> {
        cpal::host_from_id(self.host_id)
            .map_err(|e| CaptureError::DeviceNotAvailable(format!("audio host unavailable: {}", e)))
    }

    /// Send `command` to the stream thread and wait for it to exit.
    fn shutdown(&mut self, command: Command) -> Result<(), CaptureError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        // The thread may already have exited after a build failure.
        let _ = worker.control.send(command);
        let joined = worker.capture_handle.join();
        self.active.store(false, Ordering::SeqCst);

        joined.map_err(|_| CaptureError::StreamStopFailed("capture thread panicked".into()))
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for CpalBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn is_available(&self) -> bool {
        self.host()
            .map(|host| host.default_input_device().is_some())
            .unwrap_or(false)
    }

    fn device_defaults(&self, device_id: Option<&str>) -> Result<DeviceDefaults, CaptureError> {
        let host = self.host()?;
        let device = device::find_input_device(&host, device_id)?;
        device::device_defaults(&device)
    }

    fn input_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        device::list_input_devices(&self.host()?)
    }

    fn open(&mut self, params: &StreamParams, sink: Arc<dyn BlockSink>) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            return Err(CaptureError::StreamOpenFailed("stream already open".into()));
        }

        // Fail early on a missing device; the stream itself is built by `start`.
        let host = self.host()?;
        device::find_input_device(&host, params.device_id.as_deref())?;

        self.stream = Some((params.clone(), sink));
        Ok(())
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        let Some((params, sink)) = self.stream.as_ref() else {
            return Err(CaptureError::StreamStartFailed("stream not open".into()));
        };
        if self.worker.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let (control_tx, control_rx) = crossbeam_channel::unbounded();

        self.active.store(true, Ordering::SeqCst);
        let host_id = self.host_id;
        let params = params.clone();
        let sink = Arc::clone(sink);
        let active = Arc::clone(&self.active);

        let capture_handle = thread::Builder::new()
            .name("cpal-audio-capture".into())
            .spawn(move || {
                stream_thread(host_id, params, sink, Arc::clone(&active), ready_tx, control_rx);
                active.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.active.store(false, Ordering::SeqCst);
                CaptureError::StreamStartFailed(format!("failed to spawn capture thread: {}", e))
            })?;

        self.worker = Some(StreamWorker {
            control: control_tx,
            capture_handle,
        });

        let outcome = match ready_rx.recv_timeout(START_TIMEOUT) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(CaptureError::StreamStartFailed(format!(
                "stream did not start within {:?}",
                START_TIMEOUT
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                Err(CaptureError::StreamStartFailed("capture thread exited during startup".into()))
            }
        };

        if let Err(e) = outcome {
            if let Err(join_err) = self.shutdown(Command::Abort) {
                log::warn!("Capture thread cleanup after failed start: {}", join_err);
            }
            return Err(e);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.shutdown(Command::Stop)
    }

    fn abort(&mut self) -> Result<(), CaptureError> {
        self.shutdown(Command::Abort)
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        let result = self.shutdown(Command::Abort);
        self.stream = None;
        result
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Body of the stream thread.
///
/// Sequence:
/// 1. Resolve the device and build the input stream
/// 2. Play it and report the outcome on `ready`
/// 3. Block until a command arrives (or the backend is dropped)
/// 4. Pause on `Stop`, then drop the stream
fn stream_thread(
    host_id: cpal::HostId,
    params: StreamParams,
    sink: Arc<dyn BlockSink>,
    active: Arc<AtomicBool>,
    ready: Sender<Result<(), CaptureError>>,
    control: Receiver<Command>,
) {
    let stream = match build_stream(host_id, &params, sink, active) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(CaptureError::StreamStartFailed(format!("failed to play stream: {}", e))));
        return;
    }
    let _ = ready.send(Ok(()));
    log::debug!("cpal stream playing: {} Hz, {} ch", params.sample_rate, params.channels);

    match control.recv() {
        Ok(Command::Stop) => {
            if let Err(e) = stream.pause() {
                log::warn!("Failed to pause cpal stream: {}", e);
            }
        }
        Ok(Command::Abort) | Err(_) => {}
    }
    drop(stream);
}

fn build_stream(
    host_id: cpal::HostId,
    params: &StreamParams,
    sink: Arc<dyn BlockSink>,
    active: Arc<AtomicBool>,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::host_from_id(host_id)
        .map_err(|e| CaptureError::DeviceNotAvailable(format!("audio host unavailable: {}", e)))?;
    let device = device::find_input_device(&host, params.device_id.as_deref())?;
    let sample_format = device
        .default_input_config()
        .map_err(|e| CaptureError::StreamOpenFailed(format!("no default input config: {}", e)))?
        .sample_format();

    let config = cpal::StreamConfig {
        channels: params.channels,
        sample_rate: cpal::SampleRate(params.sample_rate),
        buffer_size: params
            .frames_per_block
            .map_or(cpal::BufferSize::Default, cpal::BufferSize::Fixed),
    };

    match sample_format {
        cpal::SampleFormat::F32 => build_converting::<f32, _>(&device, &config, params, sink, active, |s| s),
        cpal::SampleFormat::I16 => {
            build_converting::<i16, _>(&device, &config, params, sink, active, |s| s as f32 / 32768.0)
        }
        cpal::SampleFormat::U16 => build_converting::<u16, _>(&device, &config, params, sink, active, |s| {
            (s as f32 - 32768.0) / 32768.0
        }),
        other => Err(CaptureError::UnsupportedFormat(format!("device sample format {:?}", other))),
    }
}

/// Build an input stream for device samples of type `T`, converted to
/// `f32` into a scratch buffer before each block is forwarded.
fn build_converting<T, F>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    params: &StreamParams,
    sink: Arc<dyn BlockSink>,
    active: Arc<AtomicBool>,
    convert: F,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::SizedSample,
    F: Fn(T) -> f32 + Send + 'static,
{
    let channels = config.channels.max(1) as usize;
    let scratch_frames = params.frames_per_block.map_or(DEFAULT_SCRATCH_FRAMES, |f| f as usize);
    let mut scratch: Vec<f32> = Vec::with_capacity(scratch_frames * channels);
    let mut finished = false;
    let clock = params.clock.clone();

    let data_sink = Arc::clone(&sink);
    let data_active = Arc::clone(&active);
    let on_data = move |data: &[T], _: &cpal::InputCallbackInfo| {
        if finished {
            return;
        }
        let now_ns = clock.now_ns();

        // Only grows if the host delivers a larger block than requested.
        scratch.clear();
        scratch.extend(data.iter().map(|&sample| convert(sample)));

        let frames = data.len() / channels;
        if data_sink.on_block(Some(&scratch), frames, now_ns) == StreamControl::Complete {
            finished = true;
            data_active.store(false, Ordering::SeqCst);
        }
    };

    let on_error = move |err: cpal::StreamError| {
        active.store(false, Ordering::SeqCst);
        sink.on_stream_error(&CaptureError::StreamError(err.to_string()));
    };

    device
        .build_input_stream(config, on_data, on_error, None)
        .map_err(|e| CaptureError::StreamOpenFailed(format!("failed to build input stream: {}", e)))
}
