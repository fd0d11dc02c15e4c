use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::audio_models::{AudioSource, CaptureSessionDiagnostics, DeviceDefaults, ResolvedFormat};
use crate::models::config::{CaptureConfiguration, PCM_FRAME_SIZE};
use crate::models::error::CaptureError;
use crate::models::session_report::SessionReport;
use crate::models::state::CaptureState;
use crate::session::callback::CaptureCallback;
use crate::session::handle::{FrameConsumer, SessionHandle};
use crate::session::state::SessionState;
use crate::timebase::MonotonicClock;
use crate::traits::capture_backend::{BlockSink, CaptureBackend, StreamParams};
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::encoder::EncoderFrameInfo;
use crate::traits::video_clock::VideoClock;

/// Ring slots allocated per session.
pub const AUDIO_RING_SLOTS: usize = 80;

/// Width of the samples the backend delivers (`f32`).
const NATIVE_BYTES_PER_SAMPLE: usize = std::mem::size_of::<f32>();

/// Audio capture session synchronized to a video stream.
///
/// Generic over the audio transport via `CaptureBackend`. Data flow:
/// ```text
/// [Backend thread] → [CaptureCallback] → accumulate → [ClockSync] → [RingBuffer]
///                                                                       ↓
///                                         [SessionHandle / FrameConsumer] → encoder
/// ```
///
/// Frame size is resolved by `configure` and fixed until `stop`; each
/// `start` allocates fresh buffers and `stop` frees them.
pub struct AudioCaptureSession<B: CaptureBackend> {
    backend: B,
    clock: MonotonicClock,
    video: Arc<dyn VideoClock>,
    session_state: Arc<Mutex<SessionState>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    config: Option<CaptureConfiguration>,
    format: Option<ResolvedFormat>,
    ring_slots: usize,
    stream_open: bool,
    session_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    last_report: Option<SessionReport>,
}

impl<B: CaptureBackend> AudioCaptureSession<B> {
    pub fn new(backend: B, clock: MonotonicClock, video: Arc<dyn VideoClock>) -> Self {
        Self {
            backend,
            clock,
            video,
            session_state: Arc::new(Mutex::new(SessionState::new())),
            delegate: None,
            config: None,
            format: None,
            ring_slots: AUDIO_RING_SLOTS,
            stream_open: false,
            session_id: None,
            started_at: None,
            last_report: None,
        }
    }

    /// Override the ring capacity. Takes effect at the next `start`.
    pub fn with_ring_slots(mut self, slots: usize) -> Self {
        self.ring_slots = slots;
        self
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> CaptureState {
        self.session_state.lock().state.clone()
    }

    pub fn format(&self) -> Option<ResolvedFormat> {
        self.format
    }

    pub fn is_streaming(&self) -> bool {
        self.session_state.lock().streaming
    }

    pub fn diagnostics(&self) -> CaptureSessionDiagnostics {
        self.session_state.lock().diagnostics.clone()
    }

    /// Report of the last session torn down by `stop`.
    pub fn last_report(&self) -> Option<&SessionReport> {
        self.last_report.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn clock(&self) -> &MonotonicClock {
        &self.clock
    }

    /// Handle for consumers and the video path.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(Arc::clone(&self.session_state))
    }

    pub fn consumer(&self) -> FrameConsumer {
        FrameConsumer::new(self.handle())
    }

    pub fn available_audio_sources(&self) -> Result<Vec<AudioSource>, CaptureError> {
        if !self.backend.is_available() {
            return Ok(Vec::new());
        }
        self.backend.input_devices()
    }

    /// Resolve the stream format. Transitions: idle → configured.
    ///
    /// Must run after the audio encoder is opened: every codec but raw PCM
    /// takes its frame size from `encoder`.
    pub fn configure(
        &mut self,
        config: CaptureConfiguration,
        defaults: &DeviceDefaults,
        encoder: Option<&dyn EncoderFrameInfo>,
    ) -> Result<ResolvedFormat, CaptureError> {
        {
            let s = self.session_state.lock();
            if !s.state.can_configure() {
                return Err(CaptureError::InvalidState(format!(
                    "cannot configure while {}",
                    s.state.name()
                )));
            }
        }

        config.validate().map_err(CaptureError::ConfigurationFailed)?;

        let sample_rate = config.sample_rate.unwrap_or(defaults.sample_rate);
        if sample_rate == 0 {
            return Err(CaptureError::UnsupportedFormat("device reports no sample rate".into()));
        }

        // Devices with more than two inputs are captured as stereo.
        let channels = config
            .channels
            .unwrap_or(if defaults.channels < 3 { defaults.channels } else { 2 });
        if channels == 0 {
            return Err(CaptureError::UnsupportedFormat("device reports no input channels".into()));
        }

        let (frame_size, bytes_per_sample) = if config.audio_codec.has_fixed_frame_size() {
            let bytes = encoder.map_or(NATIVE_BYTES_PER_SAMPLE, |e| e.bytes_per_sample());
            (PCM_FRAME_SIZE, bytes)
        } else {
            let encoder = encoder.ok_or_else(|| {
                CaptureError::ConfigurationFailed(format!(
                    "{:?} frame size is only known once its encoder is open",
                    config.audio_codec
                ))
            })?;
            (encoder.frame_size(), encoder.bytes_per_sample())
        };
        if frame_size == 0 || bytes_per_sample == 0 {
            return Err(CaptureError::UnsupportedFormat(format!(
                "{:?} encoder negotiated frame size {} with {} bytes per sample",
                config.audio_codec, frame_size, bytes_per_sample
            )));
        }

        let format = ResolvedFormat {
            sample_rate,
            channels,
            frame_size,
            samples_per_frame: frame_size * channels as usize,
            bytes_per_sample,
            output_delay_ns: config.resolve_output_delay(),
        };

        {
            let mut s = self.session_state.lock();
            s.format = Some(format);
            s.skip_frames = config.skip_frames;
        }

        log::info!(
            "Audio configured: {} Hz, {} ch, {:?} frame {} samples, delay {} ns",
            format.sample_rate,
            format.channels,
            config.audio_codec,
            format.samples_per_frame,
            format.output_delay_ns
        );

        self.format = Some(format);
        self.config = Some(config);
        self.set_state(CaptureState::Configured);
        Ok(format)
    }

    /// `configure` using the backend's defaults for the configured device.
    pub fn configure_for_device(
        &mut self,
        config: CaptureConfiguration,
        encoder: Option<&dyn EncoderFrameInfo>,
    ) -> Result<ResolvedFormat, CaptureError> {
        let defaults = self.backend.device_defaults(config.device_id.as_deref())?;
        self.configure(config, &defaults, encoder)
    }

    /// Allocate buffers and start the hardware stream.
    /// Transitions: configured → capturing (or failed).
    pub fn start(&mut self) -> Result<(), CaptureError> {
        {
            let s = self.session_state.lock();
            if !matches!(s.state, CaptureState::Configured) {
                return Err(CaptureError::InvalidState(format!("cannot start while {}", s.state.name())));
            }
        }

        let (format, config) = match (self.format, self.config.as_ref()) {
            (Some(format), Some(config)) => (format, config),
            _ => return Err(CaptureError::InvalidState("not configured".into())),
        };

        let params = StreamParams {
            device_id: config.device_id.clone(),
            sample_rate: format.sample_rate,
            channels: format.channels,
            frames_per_block: config.block_frames,
            clock: self.clock.clone(),
        };

        let allocated = self.session_state.lock().allocate(&format, self.ring_slots);
        if let Err(e) = allocated {
            return Err(self.fail_start(e));
        }

        let sink: Arc<dyn BlockSink> = Arc::new(CaptureCallback::new(
            Arc::clone(&self.session_state),
            Arc::clone(&self.video),
            self.delegate.clone(),
        ));

        if let Err(e) = self.backend.open(&params, sink) {
            return Err(self.fail_start(e));
        }
        self.stream_open = true;

        if let Err(e) = self.backend.start() {
            return Err(self.fail_start(e));
        }

        // Sound start time, the audio side of the A/V anchor.
        let begin = self.clock.now_ns();
        self.session_state.lock().clock.set_capture_begin(begin);

        self.session_id = Some(Uuid::new_v4());
        self.started_at = Some(Utc::now());
        self.set_state(CaptureState::Capturing);
        log::info!(
            "Audio capture started on {} ({} slots of {} samples)",
            self.backend.name(),
            self.ring_slots,
            format.samples_per_frame
        );
        Ok(())
    }

    /// Stop the stream and free every buffer. Idempotent.
    ///
    /// Teardown always runs to completion; the first backend error, if any,
    /// is returned afterwards.
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        let was_capturing = self.session_state.lock().state.is_capturing();
        if was_capturing {
            self.set_state(CaptureState::Stopping);
        }

        // No more frames once the callback sees this.
        self.session_state.lock().capture_active = false;

        let mut first_error = None;
        if self.stream_open {
            let result = if self.backend.is_active() {
                log::info!("Aborting audio stream");
                self.backend.abort()
            } else {
                log::info!("Stopping audio stream");
                self.backend.stop()
            };
            if let Err(e) = result {
                log::error!("Error stopping audio stream [{}]: {}", e.category(), e);
                first_error.get_or_insert(e);
            }

            log::info!("Closing audio stream");
            if let Err(e) = self.backend.close() {
                log::error!("Error closing audio stream [{}]: {}", e.category(), e);
                first_error.get_or_insert(e);
            }
            self.stream_open = false;
        }

        // The backend has stopped calling back; free under the same lock the
        // callback takes.
        let diagnostics = {
            let mut s = self.session_state.lock();
            s.release();
            s.format = None;
            s.skip_frames = 0;
            s.diagnostics.clone()
        };

        if was_capturing {
            self.finish_report(diagnostics);
        }

        self.format = None;
        self.config = None;
        self.session_id = None;
        self.started_at = None;
        if !self.session_state.lock().state.is_idle() {
            self.set_state(CaptureState::Idle);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // --- Internal helpers ---

    fn set_state(&self, new_state: CaptureState) {
        {
            let mut s = self.session_state.lock();
            s.state = new_state.clone();
        }
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }

    /// Undo a partial `start` and record the failure.
    fn fail_start(&mut self, error: CaptureError) -> CaptureError {
        log::error!("Failed to start audio capture [{}]: {}", error.category(), error);

        if self.stream_open {
            if let Err(e) = self.backend.abort() {
                log::warn!("Abort after failed start: {}", e);
            }
            if let Err(e) = self.backend.close() {
                log::warn!("Close after failed start: {}", e);
            }
            self.stream_open = false;
        }

        self.session_state.lock().release();

        if let Some(ref delegate) = self.delegate {
            delegate.on_error(&error);
        }
        self.set_state(CaptureState::Failed(error.clone()));
        error
    }

    fn finish_report(&mut self, diagnostics: CaptureSessionDiagnostics) {
        let (Some(session_id), Some(started_at), Some(format)) = (self.session_id, self.started_at, self.format)
        else {
            return;
        };

        let report = SessionReport {
            session_id,
            backend: self.backend.name().to_string(),
            started_at,
            stopped_at: Utc::now(),
            format,
            diagnostics,
        };

        log::info!(
            "Audio capture finished: {} frames published, {} dropped, last drift {} ns",
            report.diagnostics.frames_published,
            report.diagnostics.frames_dropped,
            report.diagnostics.last_drift_ns
        );

        if let Some(ref delegate) = self.delegate {
            delegate.on_capture_finished(&report);
        }
        self.last_report = Some(report);
    }
}

impl<B: CaptureBackend> Drop for AudioCaptureSession<B> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::models::config::{AudioCodec, FrameRate, VideoCodec};
    use crate::session::video_link::VideoLink;
    use crate::traits::capture_backend::StreamControl;
    use crate::traits::encoder::FixedEncoderInfo;

    const MS: u64 = 1_000_000;
    const STEREO_48K: DeviceDefaults = DeviceDefaults {
        sample_rate: 48_000,
        channels: 2,
    };

    /// Backend driven by the test: blocks are delivered by `deliver`.
    #[derive(Default)]
    struct ManualBackend {
        sink: Mutex<Option<Arc<dyn BlockSink>>>,
        calls: Mutex<Vec<&'static str>>,
        active: AtomicBool,
        fail_start: bool,
    }

    impl ManualBackend {
        fn failing_start() -> Self {
            Self {
                fail_start: true,
                ..Default::default()
            }
        }

        fn deliver(&self, samples: Option<&[f32]>, frames: usize, now_ns: u64) -> StreamControl {
            let sink = self.sink.lock().clone();
            match sink {
                Some(sink) => sink.on_block(samples, frames, now_ns),
                None => StreamControl::Complete,
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().clone()
        }
    }

    impl CaptureBackend for ManualBackend {
        fn name(&self) -> &str {
            "manual"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn device_defaults(&self, _device_id: Option<&str>) -> Result<DeviceDefaults, CaptureError> {
            Ok(STEREO_48K)
        }

        fn input_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
            Ok(Vec::new())
        }

        fn open(&mut self, _params: &StreamParams, sink: Arc<dyn BlockSink>) -> Result<(), CaptureError> {
            self.calls.lock().push("open");
            *self.sink.lock() = Some(sink);
            Ok(())
        }

        fn start(&mut self) -> Result<(), CaptureError> {
            self.calls.lock().push("start");
            if self.fail_start {
                return Err(CaptureError::StreamStartFailed("device busy".into()));
            }
            self.active.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }

        fn stop(&mut self) -> Result<(), CaptureError> {
            self.calls.lock().push("stop");
            self.active.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn abort(&mut self) -> Result<(), CaptureError> {
            self.calls.lock().push("abort");
            self.active.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn close(&mut self) -> Result<(), CaptureError> {
            self.calls.lock().push("close");
            *self.sink.lock() = None;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingDelegate {
        states: Mutex<Vec<&'static str>>,
        errors: Mutex<Vec<CaptureError>>,
        reports: Mutex<Vec<SessionReport>>,
    }

    impl CaptureDelegate for RecordingDelegate {
        fn on_state_changed(&self, state: &CaptureState) {
            self.states.lock().push(state.name());
        }

        fn on_error(&self, error: &CaptureError) {
            self.errors.lock().push(error.clone());
        }

        fn on_capture_finished(&self, report: &SessionReport) {
            self.reports.lock().push(report.clone());
        }
    }

    fn session(backend: ManualBackend) -> (AudioCaptureSession<ManualBackend>, Arc<VideoLink>) {
        let video = Arc::new(VideoLink::new());
        let session = AudioCaptureSession::new(backend, MonotonicClock::new(), video.clone());
        (session, video)
    }

    #[test]
    fn pcm_uses_fixed_frame_and_native_width() {
        let (mut session, _) = session(ManualBackend::default());
        let format = session
            .configure(CaptureConfiguration::default(), &STEREO_48K, None)
            .unwrap();

        assert_eq!(format.frame_size, PCM_FRAME_SIZE);
        assert_eq!(format.samples_per_frame, 2304);
        assert_eq!(format.bytes_per_sample, 4);
        assert_eq!(format.output_delay_ns, 0);
        assert_eq!(session.state(), CaptureState::Configured);
    }

    #[test]
    fn encoder_codec_requires_open_encoder() {
        let (mut session, _) = session(ManualBackend::default());
        let config = CaptureConfiguration {
            audio_codec: AudioCodec::Mp2,
            ..Default::default()
        };

        let err = session.configure(config.clone(), &STEREO_48K, None).unwrap_err();
        assert!(matches!(err, CaptureError::ConfigurationFailed(_)));
        assert!(session.state().is_idle());

        let encoder = FixedEncoderInfo {
            frame_size: 1152,
            bytes_per_sample: 2,
        };
        let format = session.configure(config, &STEREO_48K, Some(&encoder)).unwrap();
        assert_eq!(format.samples_per_frame, 2304);
        assert_eq!(format.frame_bytes(), 4608);
    }

    #[test]
    fn zero_encoder_frame_size_is_unsupported() {
        let (mut session, _) = session(ManualBackend::default());
        let config = CaptureConfiguration {
            audio_codec: AudioCodec::Aac,
            ..Default::default()
        };
        let encoder = FixedEncoderInfo {
            frame_size: 0,
            bytes_per_sample: 2,
        };
        assert!(matches!(
            session.configure(config, &STEREO_48K, Some(&encoder)),
            Err(CaptureError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn multichannel_devices_capture_stereo() {
        let (mut session, _) = session(ManualBackend::default());
        let surround = DeviceDefaults {
            sample_rate: 44_100,
            channels: 6,
        };
        let format = session.configure(CaptureConfiguration::default(), &surround, None).unwrap();
        assert_eq!(format.channels, 2);
        assert_eq!(format.sample_rate, 44_100);

        let mono = DeviceDefaults {
            sample_rate: 16_000,
            channels: 1,
        };
        let format = session.configure(CaptureConfiguration::default(), &mono, None).unwrap();
        assert_eq!(format.channels, 1);
    }

    #[test]
    fn h264_output_delay_uses_encoder_rate() {
        let (mut session, _) = session(ManualBackend::default());
        let config = CaptureConfiguration {
            video_codec: VideoCodec::H264,
            video_frame_rate: FrameRate::new(30, 1),
            encoder_frame_rate: Some(FrameRate::new(25, 1)),
            user_delay_ns: 5 * MS,
            ..Default::default()
        };
        let format = session.configure(config, &STEREO_48K, None).unwrap();
        assert_eq!(format.output_delay_ns, 80 * MS + 5 * MS);
    }

    #[test]
    fn captures_frames_at_exact_spacing() {
        let (mut session, video) = session(ManualBackend::default());
        session.configure(CaptureConfiguration::default(), &STEREO_48K, None).unwrap();

        video.set_capturing(true);
        video.mark_first_frame(session.clock().now_ns());
        std::thread::sleep(std::time::Duration::from_millis(2));

        session.start().unwrap();
        assert!(session.state().is_capturing());

        let block = vec![0.1f32; 1152 * 2];
        let base = session.clock().now_ns();
        for i in 0..48u64 {
            let control = session.backend().deliver(Some(&block), 1152, base + (i + 1) * 24 * MS);
            assert_eq!(control, StreamControl::Continue);
        }

        let mut consumer = session.consumer();
        let mut timestamps = Vec::new();
        while let Some(frame) = consumer.try_consume_pcm16() {
            assert_eq!(frame.samples.len(), 2304);
            assert_eq!(frame.samples[0], 3276);
            timestamps.push(frame.timestamp_ns);
        }

        assert_eq!(timestamps.len(), 48);
        assert!(timestamps[0] > UNSYNCED_ANCHOR);
        assert!(timestamps.windows(2).all(|w| w[1] - w[0] == 24 * MS));
        assert_eq!(session.diagnostics().frames_published, 48);
        assert!(session.is_streaming());
    }

    const UNSYNCED_ANCHOR: u64 = crate::processing::clock_sync::UNSYNCED_ANCHOR_NS;

    #[test]
    fn skipped_video_frames_discard_audio() {
        let (mut session, video) = session(ManualBackend::default());
        let config = CaptureConfiguration {
            skip_frames: 2,
            ..Default::default()
        };
        session.configure(config, &STEREO_48K, None).unwrap();
        video.set_capturing(true);
        session.start().unwrap();

        let handle = session.handle();
        let block = vec![0.0f32; 1152 * 2];
        session.backend().deliver(Some(&block), 1152, 24 * MS);
        assert_eq!(handle.pending_frames(), 0);
        assert_eq!(handle.skip_frames(), 2);

        assert_eq!(handle.frame_skipped(), 1);
        assert_eq!(handle.frame_skipped(), 0);
        assert_eq!(handle.frame_skipped(), 0);

        session.backend().deliver(Some(&block), 1152, 48 * MS);
        assert_eq!(handle.pending_frames(), 1);
        assert_eq!(session.diagnostics().skipped_blocks, 1);
    }

    #[test]
    fn stop_before_start_and_twice_is_harmless() {
        let (mut session, _) = session(ManualBackend::default());
        assert!(session.stop().is_ok());
        assert!(session.state().is_idle());

        session.configure(CaptureConfiguration::default(), &STEREO_48K, None).unwrap();
        session.start().unwrap();
        assert!(session.stop().is_ok());
        assert!(session.stop().is_ok());

        assert_eq!(session.backend().calls(), vec!["open", "start", "abort", "close"]);
        assert!(session.state().is_idle());
        assert!(session.format().is_none());
        assert_eq!(session.handle().pending_frames(), 0);
    }

    #[test]
    fn stop_uses_graceful_stop_when_stream_finished() {
        let (mut session, video) = session(ManualBackend::default());
        session.configure(CaptureConfiguration::default(), &STEREO_48K, None).unwrap();
        video.set_capturing(true);
        session.start().unwrap();
        session.backend().active.store(false, Ordering::SeqCst);

        session.stop().unwrap();
        assert_eq!(session.backend().calls(), vec!["open", "start", "stop", "close"]);
    }

    #[test]
    fn start_requires_configuration() {
        let (mut session, _) = session(ManualBackend::default());
        assert!(matches!(session.start(), Err(CaptureError::InvalidState(_))));
        assert!(session.backend().calls().is_empty());
    }

    #[test]
    fn start_failure_releases_buffers() {
        let delegate = Arc::new(RecordingDelegate::default());
        let (mut session, _) = session(ManualBackend::failing_start());
        session.set_delegate(delegate.clone());
        session.configure(CaptureConfiguration::default(), &STEREO_48K, None).unwrap();

        let err = session.start().unwrap_err();
        assert!(matches!(err, CaptureError::StreamStartFailed(_)));
        assert_eq!(session.state(), CaptureState::Failed(err.clone()));
        assert_eq!(session.backend().calls(), vec!["open", "start", "abort", "close"]);
        assert_eq!(
            session.backend().deliver(Some(&[0.0; 4]), 2, 10 * MS),
            StreamControl::Complete
        );
        assert_eq!(*delegate.errors.lock(), vec![err]);

        // A failed session can be configured again.
        assert!(session.configure(CaptureConfiguration::default(), &STEREO_48K, None).is_ok());
    }

    #[test]
    fn reconfigure_while_capturing_is_rejected() {
        let (mut session, _) = session(ManualBackend::default());
        session.configure(CaptureConfiguration::default(), &STEREO_48K, None).unwrap();
        session.start().unwrap();

        assert!(matches!(
            session.configure(CaptureConfiguration::default(), &STEREO_48K, None),
            Err(CaptureError::InvalidState(_))
        ));
        assert!(matches!(session.start(), Err(CaptureError::InvalidState(_))));
    }

    #[test]
    fn delegate_sees_lifecycle_and_report() {
        let delegate = Arc::new(RecordingDelegate::default());
        let (mut session, video) = session(ManualBackend::default());
        session.set_delegate(delegate.clone());

        session.configure_for_device(CaptureConfiguration::default(), None).unwrap();
        video.set_capturing(true);
        session.start().unwrap();
        let block = vec![0.0f32; 1152 * 2];
        session.backend().deliver(Some(&block), 1152, 24 * MS);
        session.backend().deliver(None, 1152, 48 * MS);
        session.stop().unwrap();

        assert_eq!(
            *delegate.states.lock(),
            vec!["configured", "capturing", "stopping", "idle"]
        );
        let reports = delegate.reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].backend, "manual");
        assert_eq!(reports[0].diagnostics.frames_published, 2);
        assert_eq!(reports[0].diagnostics.silent_blocks, 1);
        assert_eq!(session.last_report().map(|r| r.session_id), Some(reports[0].session_id));
    }

    #[test]
    fn video_stop_completes_stream() {
        let (mut session, video) = session(ManualBackend::default());
        session.configure(CaptureConfiguration::default(), &STEREO_48K, None).unwrap();
        video.set_capturing(true);
        session.start().unwrap();

        let block = vec![0.0f32; 1152 * 2];
        assert_eq!(session.backend().deliver(Some(&block), 1152, 24 * MS), StreamControl::Continue);
        video.set_capturing(false);
        assert_eq!(session.backend().deliver(Some(&block), 1152, 48 * MS), StreamControl::Complete);
        assert!(!session.is_streaming());
        assert_eq!(session.handle().pending_frames(), 2);
    }

    #[test]
    fn synthetic_backend_end_to_end() {
        use crate::backend::synthetic::SyntheticBackend;

        let video = Arc::new(VideoLink::new());
        let clock = MonotonicClock::new();
        let mut session = AudioCaptureSession::new(SyntheticBackend::default(), clock.clone(), video.clone())
            .with_ring_slots(8);
        let config = CaptureConfiguration {
            block_frames: Some(480),
            ..Default::default()
        };
        session.configure_for_device(config, None).unwrap();

        video.set_capturing(true);
        video.mark_first_frame(clock.now_ns());
        session.start().unwrap();

        let handle = session.handle();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while handle.pending_frames() < 3 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        session.stop().unwrap();

        let report = session.last_report().unwrap();
        assert!(report.diagnostics.frames_published >= 3);
        assert_eq!(report.backend, "synthetic");
    }
}
