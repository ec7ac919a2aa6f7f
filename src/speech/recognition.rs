//! Continuous speech recognition session
//!
//! Models a recognition session the way the composer consumes it: the
//! session emits cumulative result snapshots (interim and final), error
//! notifications, and an end notification when the underlying session
//! terminates for any reason. The dictation controller decides whether
//! an end is a user stop or session churn that warrants a restart.

use crate::{ParleyError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::PathBuf;

/// Sample rate the recognition engine operates at
pub const RECOGNITION_SAMPLE_RATE: u32 = 16000;

/// Configuration for a recognition session
#[derive(Clone, Debug)]
pub struct RecognitionConfig {
    /// Keep the session open across result boundaries
    pub continuous: bool,

    /// Emit interim transcriptions while a speech segment is still open
    pub interim_results: bool,

    /// Language tag, e.g. "en-US"
    pub language: String,

    /// Path to the Whisper model file
    pub model_path: PathBuf,

    /// Number of threads to use for transcription
    pub n_threads: i32,

    /// Speech probability threshold for the VAD
    pub vad_threshold: f32,

    /// Silence duration that finalizes an open segment (seconds)
    pub silence_threshold: f32,

    /// Minimum speech segment duration worth transcribing (seconds)
    pub min_segment_duration: f32,

    /// Maximum speech segment duration before a forced finalize (seconds)
    pub max_segment_duration: f32,

    /// Interval between interim decodes of an open segment (seconds)
    pub interim_interval: f32,

    /// Seconds without any speech before the session ends on its own,
    /// mirroring platform session churn. None keeps it open forever.
    pub auto_end_after: Option<f32>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
            language: "en-US".to_string(),
            model_path: PathBuf::from("models/ggml-base.en.bin"),
            n_threads: 4,
            vad_threshold: 0.5,
            silence_threshold: 0.6,
            min_segment_duration: 0.3,
            max_segment_duration: 30.0,
            interim_interval: 1.0,
            auto_end_after: Some(60.0),
        }
    }
}

impl RecognitionConfig {
    pub fn with_model(mut self, model_path: impl Into<PathBuf>) -> Self {
        self.model_path = model_path.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn one_shot(mut self) -> Self {
        self.continuous = false;
        self
    }

    /// Primary language subtag for the transcription engine ("en-US" -> "en")
    pub fn primary_language(&self) -> String {
        self.language
            .split('-')
            .next()
            .unwrap_or(&self.language)
            .to_lowercase()
    }
}

/// One transcription hypothesis, best first in the result's list
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionAlternative {
    pub transcript: String,
    pub confidence: Option<f32>,
}

/// One recognized stretch of speech, interim until its segment closes
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    /// Alternatives ordered best-first
    pub alternatives: Vec<RecognitionAlternative>,
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            alternatives: vec![RecognitionAlternative {
                transcript: transcript.into(),
                confidence: None,
            }],
            is_final: false,
        }
    }

    pub fn finalized(transcript: impl Into<String>) -> Self {
        Self {
            alternatives: vec![RecognitionAlternative {
                transcript: transcript.into(),
                confidence: None,
            }],
            is_final: true,
        }
    }

    /// Transcript of the best alternative
    pub fn top(&self) -> Option<&str> {
        self.alternatives.first().map(|a| a.transcript.as_str())
    }
}

/// Event emitted by a recognition session
#[derive(Debug, Clone)]
pub enum RecognitionEvent {
    /// Cumulative snapshot of every result in the session so far,
    /// interim results included
    Results(Vec<RecognitionResult>),

    /// A recoverable recognition error; the session keeps running
    Error(String),

    /// The underlying session terminated, whether requested or not
    End,
}

/// The seam between the dictation controller and a concrete engine.
///
/// Implementations own their capture and transcription resources and
/// report through the event channel. `stop()` must always be followed
/// by an `End` event so the controller can distinguish a user stop
/// (already in `Idle`) from session churn (still `Listening`). The
/// controller and engine live on the UI thread; only the engine's
/// internal workers cross threads.
pub trait RecognitionEngine {
    /// Start a session. Fails if one is already active.
    fn start(&mut self) -> Result<()>;

    /// Request the active session to stop.
    fn stop(&mut self);

    /// Whether a session is currently active.
    fn is_active(&self) -> bool;

    /// Clone of the event channel this engine reports on.
    fn events(&self) -> Receiver<RecognitionEvent>;
}

/// Channel capacity for session events
const EVENT_QUEUE: usize = 100;

pub(crate) fn event_channel() -> (Sender<RecognitionEvent>, Receiver<RecognitionEvent>) {
    bounded(EVENT_QUEUE)
}

#[cfg(feature = "audio-io")]
pub use engine::WhisperRecognizer;

#[cfg(feature = "audio-io")]
mod engine {
    use super::*;
    use crate::audio::{CaptureBuffer, Microphone, Resampler, SpeechDetector};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread::JoinHandle;
    use std::time::Duration;
    use tracing::{debug, error, info, warn};
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// Recognition engine backed by microphone capture, VAD segmentation
    /// and Whisper transcription on a worker thread.
    pub struct WhisperRecognizer {
        config: RecognitionConfig,
        context: Option<Arc<WhisperContext>>,
        event_tx: Sender<RecognitionEvent>,
        event_rx: Receiver<RecognitionEvent>,
        session: Option<Session>,
    }

    struct Session {
        microphone: Microphone,
        stop: Arc<AtomicBool>,
        worker: JoinHandle<()>,
    }

    impl WhisperRecognizer {
        pub fn new(config: RecognitionConfig) -> Result<Self> {
            if !config.model_path.exists() {
                return Err(ParleyError::ModelLoadError(format!(
                    "Model file not found: {:?}",
                    config.model_path
                )));
            }

            let (event_tx, event_rx) = event_channel();

            Ok(Self {
                config,
                context: None,
                event_tx,
                event_rx,
                session: None,
            })
        }

        /// Load the Whisper model once; restarts reuse the same context.
        fn context(&mut self) -> Result<Arc<WhisperContext>> {
            if let Some(ctx) = &self.context {
                return Ok(Arc::clone(ctx));
            }

            info!("Loading Whisper model from: {:?}", self.config.model_path);

            let path = self
                .config
                .model_path
                .to_str()
                .ok_or_else(|| ParleyError::ModelLoadError("Invalid model path".to_string()))?;

            let ctx = WhisperContext::new_with_params(path, WhisperContextParameters::default())
                .map_err(|e| {
                    ParleyError::ModelLoadError(format!("Failed to load Whisper model: {:?}", e))
                })?;

            let ctx = Arc::new(ctx);
            self.context = Some(Arc::clone(&ctx));
            Ok(ctx)
        }

        fn teardown_session(&mut self) {
            if let Some(mut session) = self.session.take() {
                session.stop.store(true, Ordering::SeqCst);
                session.microphone.stop_capture();
                // The worker drains out on its own and emits End
            }
        }
    }

    impl RecognitionEngine for WhisperRecognizer {
        fn start(&mut self) -> Result<()> {
            if self.is_active() {
                return Err(ParleyError::RecognitionError(
                    "Recognition session already active".into(),
                ));
            }
            // A session whose worker already exited (self-terminated) is
            // stale; release its capture stream before starting anew.
            self.teardown_session();

            let context = self.context()?;

            let mut microphone = Microphone::new()?;
            let device_rate = microphone.sample_rate();
            let capture = CaptureBuffer::new(device_rate as usize * 30);
            microphone.start_capture(capture.clone())?;

            let stop = Arc::new(AtomicBool::new(false));
            let worker = spawn_worker(
                self.config.clone(),
                context,
                capture,
                device_rate,
                Arc::clone(&stop),
                self.event_tx.clone(),
            )?;

            self.session = Some(Session {
                microphone,
                stop,
                worker,
            });

            debug!("Recognition session started ({} Hz capture)", device_rate);
            Ok(())
        }

        fn stop(&mut self) {
            self.teardown_session();
        }

        fn is_active(&self) -> bool {
            self.session
                .as_ref()
                .map(|s| !s.worker.is_finished())
                .unwrap_or(false)
        }

        fn events(&self) -> Receiver<RecognitionEvent> {
            self.event_rx.clone()
        }
    }

    impl Drop for WhisperRecognizer {
        fn drop(&mut self) {
            self.teardown_session();
        }
    }

    fn spawn_worker(
        config: RecognitionConfig,
        context: Arc<WhisperContext>,
        capture: CaptureBuffer,
        device_rate: u32,
        stop: Arc<AtomicBool>,
        event_tx: Sender<RecognitionEvent>,
    ) -> Result<JoinHandle<()>> {
        let handle = std::thread::spawn(move || {
            let mut vad = match SpeechDetector::new(RECOGNITION_SAMPLE_RATE, config.vad_threshold)
            {
                Ok(vad) => vad,
                Err(e) => {
                    error!("Failed to initialize VAD: {}", e);
                    let _ = event_tx.send(RecognitionEvent::Error(e.to_string()));
                    let _ = event_tx.send(RecognitionEvent::End);
                    return;
                }
            };

            let mut resampler = if device_rate != RECOGNITION_SAMPLE_RATE {
                match Resampler::new(device_rate, RECOGNITION_SAMPLE_RATE) {
                    Ok(r) => Some(r),
                    Err(e) => {
                        error!("Failed to initialize resampler: {}", e);
                        let _ = event_tx.send(RecognitionEvent::Error(e.to_string()));
                        let _ = event_tx.send(RecognitionEvent::End);
                        return;
                    }
                }
            } else {
                None
            };

            debug!("Recognition worker started");

            let chunk_size = vad.chunk_size();
            let chunk_secs = chunk_size as f32 / RECOGNITION_SAMPLE_RATE as f32;
            let device_chunk = 1024usize;

            let mut pending: Vec<f32> = Vec::new();
            let mut segment: Vec<f32> = Vec::new();
            let mut finals: Vec<RecognitionResult> = Vec::new();
            let mut in_speech = false;
            let mut silence_run = 0.0f32;
            let mut idle_silence = 0.0f32;
            let mut since_interim = 0.0f32;

            'session: loop {
                if stop.load(Ordering::SeqCst) {
                    break;
                }

                match capture.pop_chunk(device_chunk) {
                    Some(raw) => {
                        let resampled = match resampler.as_mut() {
                            Some(r) => match r.process(&raw) {
                                Ok(samples) => samples,
                                Err(e) => {
                                    warn!("Capture resampling failed: {}", e);
                                    let _ =
                                        event_tx.send(RecognitionEvent::Error(e.to_string()));
                                    continue;
                                }
                            },
                            None => raw,
                        };
                        pending.extend_from_slice(&resampled);
                    }
                    None => {
                        std::thread::sleep(Duration::from_millis(10));
                    }
                }

                while pending.len() >= chunk_size {
                    let chunk: Vec<f32> = pending.drain(..chunk_size).collect();
                    let is_speech = vad.is_speech(&chunk);

                    if is_speech {
                        if !in_speech {
                            in_speech = true;
                            segment.clear();
                            since_interim = 0.0;
                            debug!("Speech segment opened");
                        }
                        segment.extend_from_slice(&chunk);
                        silence_run = 0.0;
                        idle_silence = 0.0;
                        since_interim += chunk_secs;
                    } else if in_speech {
                        segment.extend_from_slice(&chunk);
                        silence_run += chunk_secs;
                        since_interim += chunk_secs;

                        if silence_run >= config.silence_threshold {
                            let duration =
                                segment.len() as f32 / RECOGNITION_SAMPLE_RATE as f32;
                            let finalized = duration >= config.min_segment_duration;
                            if finalized {
                                finalize_segment(
                                    &context, &config, &segment, &mut finals, &event_tx,
                                );
                            } else {
                                debug!("Segment too short ({:.2}s), discarding", duration);
                            }
                            segment.clear();
                            in_speech = false;
                            silence_run = 0.0;
                            if finalized && !config.continuous {
                                break 'session;
                            }
                        }
                    } else {
                        idle_silence += chunk_secs;
                        if let Some(limit) = config.auto_end_after {
                            if idle_silence >= limit {
                                debug!("No speech for {:.0}s, session ending", limit);
                                break 'session;
                            }
                        }
                    }

                    if in_speech {
                        let duration = segment.len() as f32 / RECOGNITION_SAMPLE_RATE as f32;
                        if duration >= config.max_segment_duration {
                            finalize_segment(&context, &config, &segment, &mut finals, &event_tx);
                            segment.clear();
                            in_speech = false;
                            silence_run = 0.0;
                            if !config.continuous {
                                break 'session;
                            }
                        } else if config.interim_results
                            && since_interim >= config.interim_interval
                        {
                            since_interim = 0.0;
                            match transcribe(&context, &config, &segment) {
                                Ok(text) if !text.is_empty() => {
                                    let mut snapshot = finals.clone();
                                    snapshot.push(RecognitionResult::interim(text));
                                    let _ = event_tx.send(RecognitionEvent::Results(snapshot));
                                }
                                Ok(_) => {}
                                Err(e) => {
                                    warn!("Interim transcription failed: {}", e);
                                    let _ =
                                        event_tx.send(RecognitionEvent::Error(e.to_string()));
                                }
                            }
                        }
                    }
                }
            }

            // Deliver whatever was gathered before the session closed
            if in_speech {
                let duration = segment.len() as f32 / RECOGNITION_SAMPLE_RATE as f32;
                if duration >= config.min_segment_duration {
                    finalize_segment(&context, &config, &segment, &mut finals, &event_tx);
                }
            }

            let _ = event_tx.send(RecognitionEvent::End);
            debug!("Recognition worker stopped");
        });

        Ok(handle)
    }

    fn finalize_segment(
        context: &WhisperContext,
        config: &RecognitionConfig,
        segment: &[f32],
        finals: &mut Vec<RecognitionResult>,
        event_tx: &Sender<RecognitionEvent>,
    ) {
        match transcribe(context, config, segment) {
            Ok(text) if !text.is_empty() => {
                finals.push(RecognitionResult::finalized(text));
                let _ = event_tx.send(RecognitionEvent::Results(finals.clone()));
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Transcription failed: {}", e);
                let _ = event_tx.send(RecognitionEvent::Error(e.to_string()));
            }
        }
    }

    fn transcribe(
        context: &WhisperContext,
        config: &RecognitionConfig,
        samples: &[f32],
    ) -> Result<String> {
        if samples.is_empty() {
            return Ok(String::new());
        }

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(config.n_threads);
        params.set_translate(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);

        let language = config.primary_language();
        params.set_language(Some(&language));

        let mut state = context.create_state().map_err(|e| {
            ParleyError::RecognitionError(format!("Failed to create state: {:?}", e))
        })?;

        state.full(params, samples).map_err(|e| {
            ParleyError::RecognitionError(format!("Transcription failed: {:?}", e))
        })?;

        let num_segments = state.full_n_segments().map_err(|e| {
            ParleyError::RecognitionError(format!("Failed to get segments: {:?}", e))
        })?;

        let mut text = String::new();
        for i in 0..num_segments {
            let segment_text = state.full_get_segment_text(i).map_err(|e| {
                ParleyError::RecognitionError(format!("Failed to get segment text: {:?}", e))
            })?;
            text.push_str(&segment_text);
        }

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_match_session_contract() {
        let config = RecognitionConfig::default();
        assert!(config.continuous);
        assert!(config.interim_results);
        assert_eq!(config.language, "en-US");
    }

    #[test]
    fn test_primary_language() {
        let config = RecognitionConfig::default().with_language("en-US");
        assert_eq!(config.primary_language(), "en");

        let config = RecognitionConfig::default().with_language("de");
        assert_eq!(config.primary_language(), "de");
    }

    #[test]
    fn test_one_shot_builder() {
        let config = RecognitionConfig::default().one_shot();
        assert!(!config.continuous);
    }

    #[test]
    fn test_result_top_alternative() {
        let result = RecognitionResult {
            alternatives: vec![
                RecognitionAlternative {
                    transcript: "hello world".into(),
                    confidence: Some(0.9),
                },
                RecognitionAlternative {
                    transcript: "hello word".into(),
                    confidence: Some(0.4),
                },
            ],
            is_final: true,
        };
        assert_eq!(result.top(), Some("hello world"));

        let empty = RecognitionResult {
            alternatives: vec![],
            is_final: false,
        };
        assert_eq!(empty.top(), None);
    }

    #[test]
    fn test_interim_and_finalized_constructors() {
        assert!(!RecognitionResult::interim("a").is_final);
        assert!(RecognitionResult::finalized("a").is_final);
    }
}
