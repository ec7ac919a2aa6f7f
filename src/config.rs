//! Application configuration
//!
//! Plain structs with defaults and builder methods; `validate()` is a
//! startup check that required model files exist before any engine is
//! spawned. Features whose resources are missing degrade individually
//! rather than failing the whole app.

use crate::chat::ChatPeer;
use crate::speech::{RecognitionConfig, SynthesisConfig};
use std::path::PathBuf;

/// Top-level configuration for the client
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Identity used as `sender_id` on outgoing messages
    pub user_id: String,

    /// The conversation partner
    pub peer: ChatPeer,

    /// Dictation (speech-to-text) settings
    pub recognition: RecognitionConfig,

    /// Playback (text-to-speech) settings
    pub synthesis: SynthesisConfig,

    /// Whether the microphone toggle is offered
    pub enable_dictation: bool,

    /// Whether per-message speech playback is offered
    pub enable_playback: bool,

    /// Directory holding send.wav / receive.wav cue sounds
    pub sounds_dir: PathBuf,

    /// Directory for persisted state (the task list)
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley");

        Self {
            user_id: "local-user".to_string(),
            peer: ChatPeer::new("companion", "Companion"),
            recognition: RecognitionConfig::default(),
            synthesis: SynthesisConfig::default(),
            enable_dictation: true,
            enable_playback: true,
            sounds_dir: PathBuf::from("assets/sounds"),
            data_dir,
        }
    }
}

impl AppConfig {
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_peer(mut self, peer: ChatPeer) -> Self {
        self.peer = peer;
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn without_dictation(mut self) -> Self {
        self.enable_dictation = false;
        self
    }

    pub fn without_playback(mut self) -> Self {
        self.enable_playback = false;
        self
    }

    /// Check that enabled speech features have their model files.
    pub fn validate(&self) -> Result<(), String> {
        if self.enable_dictation && !self.recognition.model_path.exists() {
            return Err(format!(
                "Whisper model not found: {:?}",
                self.recognition.model_path
            ));
        }

        if self.enable_playback {
            if self.synthesis.model_path.is_empty() {
                return Err("Synthesis model path is required".to_string());
            }
            if !std::path::Path::new(&self.synthesis.model_path).exists() {
                return Err(format!(
                    "Synthesis model not found: {}",
                    self.synthesis.model_path
                ));
            }
            if !std::path::Path::new(&self.synthesis.tokens_path).exists() {
                return Err(format!(
                    "Synthesis tokens file not found: {}",
                    self.synthesis.tokens_path
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.enable_dictation);
        assert!(config.enable_playback);
        assert!(config.data_dir.ends_with("parley"));
    }

    #[test]
    fn test_builders() {
        let config = AppConfig::default()
            .with_user("alice")
            .without_dictation()
            .without_playback();

        assert_eq!(config.user_id, "alice");
        assert!(!config.enable_dictation);
        assert!(!config.enable_playback);
    }

    #[test]
    fn test_validate_passes_with_speech_disabled() {
        let config = AppConfig::default().without_dictation().without_playback();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_fails_on_missing_models() {
        let config = AppConfig::default().without_playback();
        // Default model path does not exist in a fresh checkout
        assert!(config.validate().is_err());
    }
}
