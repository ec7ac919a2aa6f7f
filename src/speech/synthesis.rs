//! Speech synthesis with sherpa-rs (VITS models)
//!
//! One worker thread owns the synthesis engine; the utterance player
//! talks to it over command/event channels. Queued commands coalesce to
//! the newest one, since only a single utterance may ever be active.

use crate::audio::resampler::resample;
use crate::{ParleyError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use sherpa_rs::tts::{VitsTts, VitsTtsConfig};
use std::path::Path;
use std::thread;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A selectable synthesis voice (a speaker of the loaded model)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub speaker_id: i32,
}

impl Voice {
    pub fn new(name: impl Into<String>, speaker_id: i32) -> Self {
        Self {
            name: name.into(),
            speaker_id,
        }
    }
}

/// The voices available for playback, in platform order
#[derive(Debug, Clone, Default)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    pub fn new(voices: Vec<Voice>) -> Self {
        Self { voices }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Voice selection policy: the first voice whose name contains
    /// "female" (case-insensitive), falling back to the first voice.
    pub fn select_default(&self) -> Option<&Voice> {
        self.voices
            .iter()
            .find(|v| v.name.to_lowercase().contains("female"))
            .or_else(|| self.voices.first())
    }
}

/// Configuration for the synthesis engine
#[derive(Clone, Debug)]
pub struct SynthesisConfig {
    /// Path to the ONNX model file
    pub model_path: String,

    /// Path to the tokens file
    pub tokens_path: String,

    /// Path to the lexicon file (optional for some models)
    pub lexicon_path: Option<String>,

    /// Path to the data directory (optional)
    pub data_dir: Option<String>,

    /// Voices of the loaded model, in order
    pub voices: Vec<Voice>,

    /// Speaking rate; 1.0 is neutral
    pub rate: f32,

    /// Linear output gain; 1.0 is neutral
    pub volume: f32,

    /// Sample rate audio is delivered at (resampled if the model differs)
    pub output_sample_rate: u32,

    /// Capacity of the command/event channels
    pub queue_size: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            tokens_path: String::new(),
            lexicon_path: None,
            data_dir: None,
            voices: Vec::new(),
            rate: 1.0,
            volume: 1.0,
            output_sample_rate: 22050,
            queue_size: 16,
        }
    }
}

impl SynthesisConfig {
    pub fn new(model_path: impl Into<String>, tokens_path: impl Into<String>) -> Self {
        Self {
            model_path: model_path.into(),
            tokens_path: tokens_path.into(),
            ..Default::default()
        }
    }

    pub fn with_lexicon(mut self, lexicon_path: impl Into<String>) -> Self {
        self.lexicon_path = Some(lexicon_path.into());
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<String>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.output_sample_rate = sample_rate;
        self
    }

    pub fn catalog(&self) -> VoiceCatalog {
        VoiceCatalog::new(self.voices.clone())
    }
}

/// Synthesized audio for one utterance
#[derive(Clone, Debug)]
pub struct UtteranceAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub utterance_id: Uuid,
}

/// Command sent to the synthesis worker
#[derive(Clone, Debug)]
pub enum SynthesisCommand {
    Speak {
        text: String,
        speaker_id: i32,
        utterance_id: Uuid,
    },
    Shutdown,
}

/// Event emitted by the synthesis worker
#[derive(Clone, Debug)]
pub enum SynthesisEvent {
    /// Audio for an utterance is ready
    Audio(UtteranceAudio),

    /// Synthesis of the utterance finished (audio already delivered)
    Finished { utterance_id: Uuid },

    /// An error occurred during synthesis
    Error {
        error: String,
        utterance_id: Option<Uuid>,
    },

    /// The worker has shut down
    Shutdown,
}

/// Synthesis engine wrapping sherpa-rs VitsTts
pub struct SynthesisEngine {
    tts: VitsTts,
    config: SynthesisConfig,
}

impl SynthesisEngine {
    pub fn new(config: SynthesisConfig) -> Result<Self> {
        if config.model_path.is_empty() {
            return Err(ParleyError::ConfigError("Model path is required".into()));
        }
        if config.tokens_path.is_empty() {
            return Err(ParleyError::ConfigError("Tokens path is required".into()));
        }
        if !Path::new(&config.model_path).exists() {
            return Err(ParleyError::ModelLoadError(format!(
                "Model not found: {}",
                config.model_path
            )));
        }
        if !Path::new(&config.tokens_path).exists() {
            return Err(ParleyError::ModelLoadError(format!(
                "Tokens file not found: {}",
                config.tokens_path
            )));
        }

        info!("Loading VITS model from: {}", config.model_path);

        let vits_config = VitsTtsConfig {
            model: config.model_path.clone(),
            tokens: config.tokens_path.clone(),
            lexicon: config.lexicon_path.clone().unwrap_or_default(),
            data_dir: config.data_dir.clone().unwrap_or_default(),
            length_scale: 1.0 / config.rate.max(0.1),
            ..Default::default()
        };

        let tts = VitsTts::new(vits_config);

        info!("Synthesis engine initialized");

        Ok(Self { tts, config })
    }

    /// Synthesize text with the given speaker, delivered at the
    /// configured output rate with the configured gain applied.
    pub fn synthesize(&mut self, text: &str, speaker_id: i32) -> Result<(Vec<f32>, u32)> {
        let normalized = normalize_for_speech(text);
        if normalized.is_empty() {
            return Ok((Vec::new(), self.config.output_sample_rate));
        }

        debug!("Synthesizing: {}", normalized);

        let audio = self
            .tts
            .create(&normalized, speaker_id, 1.0)
            .map_err(|e| ParleyError::SynthesisError(format!("Synthesis failed: {}", e)))?;

        let model_rate = audio.sample_rate as u32;
        let mut samples = audio.samples;

        if self.config.output_sample_rate != model_rate {
            samples = resample(&samples, model_rate, self.config.output_sample_rate)?;
        }

        if (self.config.volume - 1.0).abs() > f32::EPSILON {
            for sample in &mut samples {
                *sample = (*sample * self.config.volume).clamp(-1.0, 1.0);
            }
        }

        Ok((samples, self.config.output_sample_rate))
    }
}

/// Channel-based synthesis pipeline with a dedicated worker thread
pub struct SynthesisPipeline {
    config: SynthesisConfig,
    command_tx: Sender<SynthesisCommand>,
    command_rx: Receiver<SynthesisCommand>,
    event_tx: Sender<SynthesisEvent>,
    event_rx: Receiver<SynthesisEvent>,
}

impl SynthesisPipeline {
    pub fn new(config: SynthesisConfig) -> Self {
        let (command_tx, command_rx) = bounded(config.queue_size);
        let (event_tx, event_rx) = bounded(config.queue_size);

        Self {
            config,
            command_tx,
            command_rx,
            event_tx,
            event_rx,
        }
    }

    pub fn command_sender(&self) -> Sender<SynthesisCommand> {
        self.command_tx.clone()
    }

    pub fn event_receiver(&self) -> Receiver<SynthesisEvent> {
        self.event_rx.clone()
    }

    /// Start the worker thread that owns the engine.
    pub fn start_worker(self) -> Result<thread::JoinHandle<()>> {
        let config = self.config.clone();
        let command_rx = self.command_rx.clone();
        let event_tx = self.event_tx.clone();

        let handle = thread::spawn(move || {
            info!("Synthesis worker starting");

            let mut engine = match SynthesisEngine::new(config) {
                Ok(engine) => engine,
                Err(e) => {
                    error!("Failed to initialize synthesis engine: {}", e);
                    let _ = event_tx.send(SynthesisEvent::Error {
                        error: e.to_string(),
                        utterance_id: None,
                    });
                    let _ = event_tx.send(SynthesisEvent::Shutdown);
                    return;
                }
            };

            info!("Synthesis worker ready");

            loop {
                let mut command = match command_rx.recv() {
                    Ok(command) => command,
                    Err(e) => {
                        error!("Command channel error: {}", e);
                        break;
                    }
                };

                // Coalesce: only the newest queued command matters
                while let Ok(newer) = command_rx.try_recv() {
                    command = newer;
                }

                match command {
                    SynthesisCommand::Speak {
                        text,
                        speaker_id,
                        utterance_id,
                    } => match engine.synthesize(&text, speaker_id) {
                        Ok((samples, sample_rate)) => {
                            if !samples.is_empty() {
                                let _ = event_tx.send(SynthesisEvent::Audio(UtteranceAudio {
                                    samples,
                                    sample_rate,
                                    utterance_id,
                                }));
                            }
                            let _ = event_tx.send(SynthesisEvent::Finished { utterance_id });
                        }
                        Err(e) => {
                            warn!("Synthesis failed: {}", e);
                            let _ = event_tx.send(SynthesisEvent::Error {
                                error: e.to_string(),
                                utterance_id: Some(utterance_id),
                            });
                        }
                    },

                    SynthesisCommand::Shutdown => {
                        info!("Synthesis worker shutting down");
                        let _ = event_tx.send(SynthesisEvent::Shutdown);
                        break;
                    }
                }
            }

            info!("Synthesis worker stopped");
        });

        Ok(handle)
    }
}

/// Normalize message text for synthesis: spell out common symbols and
/// strip characters the model has no pronunciation for.
pub fn normalize_for_speech(text: &str) -> String {
    let mut result = text.to_string();

    for (symbol, spoken) in [
        ("&", " and "),
        ("%", " percent"),
        ("@", " at "),
        ("#", " number "),
        ("+", " plus "),
        ("=", " equals "),
    ] {
        result = result.replace(symbol, spoken);
    }

    let result: String = result
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || ".,!?;:'-\"".contains(*c))
        .collect();

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}
