pub mod buffer;
pub mod cues;
#[cfg(feature = "audio-io")]
pub mod input;
#[cfg(feature = "audio-io")]
pub mod output;
pub mod resampler;
pub mod vad;
pub mod wav;

pub use buffer::CaptureBuffer;
pub use cues::{CueKind, MessageCues};
#[cfg(feature = "audio-io")]
pub use input::Microphone;
#[cfg(feature = "audio-io")]
pub use output::AudioOutput;
pub use resampler::{resample, Resampler};
pub use vad::SpeechDetector;
pub use wav::read_wav;
