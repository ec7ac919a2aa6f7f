pub mod dictation;
pub mod player;
pub mod recognition;
pub mod synthesis;

pub use dictation::{DictationController, DictationState};
pub use player::{AudioSink, UtterancePlayer};
pub use recognition::{
    RecognitionConfig, RecognitionEngine, RecognitionEvent, RecognitionResult,
};
pub use synthesis::{SynthesisConfig, SynthesisPipeline, Voice, VoiceCatalog};
