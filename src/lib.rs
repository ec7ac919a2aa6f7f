pub mod audio;
pub mod chat;
pub mod composer;
pub mod config;
pub mod speech;
pub mod tasks;
pub mod ui;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParleyError {
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("Model load error: {0}")]
    ModelLoadError(String),

    #[error("Recognition error: {0}")]
    RecognitionError(String),

    #[error("Synthesis error: {0}")]
    SynthesisError(String),

    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("Send error: {0}")]
    SendError(String),

    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Audio processing error: {0}")]
    AudioProcessingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for ParleyError {
    fn from(e: std::io::Error) -> Self {
        ParleyError::IOError(e.to_string())
    }
}

impl ParleyError {
    /// Check if this error is recoverable by re-invoking the same action
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Hardware/device errors may require user intervention
            ParleyError::AudioDeviceError(_) => false,
            // Model errors require restarting
            ParleyError::ModelLoadError(_) => false,
            // These are typically transient errors
            ParleyError::RecognitionError(_) => true,
            ParleyError::SynthesisError(_) => true,
            ParleyError::InvalidAttachment(_) => true,
            ParleyError::SendError(_) => true,
            ParleyError::ClipboardError(_) => true,
            ParleyError::StorageError(_) => false,
            ParleyError::AudioProcessingError(_) => true,
            ParleyError::ConfigError(_) => false,
            ParleyError::ChannelError(_) => false,
            ParleyError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description for transient notices
    pub fn user_message(&self) -> String {
        match self {
            ParleyError::AudioDeviceError(_) => {
                "Audio device error. Please check your microphone/speakers.".to_string()
            }
            ParleyError::ModelLoadError(_) => {
                "Failed to load speech model. Please verify model files are present.".to_string()
            }
            ParleyError::RecognitionError(_) => {
                "Speech recognition failed. Please try again.".to_string()
            }
            ParleyError::SynthesisError(_) => {
                "Speech playback failed. The message is still shown as text.".to_string()
            }
            ParleyError::InvalidAttachment(_) => "Please select an image file".to_string(),
            ParleyError::SendError(_) => {
                "Failed to send message. Your draft was kept.".to_string()
            }
            ParleyError::ClipboardError(_) => "Could not copy to the clipboard.".to_string(),
            ParleyError::StorageError(_) => "Failed to read or write saved data.".to_string(),
            ParleyError::AudioProcessingError(_) => {
                "Audio processing failed. Please try again.".to_string()
            }
            ParleyError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            ParleyError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            ParleyError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParleyError>;
