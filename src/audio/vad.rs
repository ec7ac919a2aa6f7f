use crate::{ParleyError, Result};
use voice_activity_detector::VoiceActivityDetector;

/// Speech/silence classifier over fixed-size chunks (Silero VAD).
///
/// The recognition session uses this to open and close speech segments:
/// a chunk above the threshold keeps a segment open, enough consecutive
/// silent chunks close it.
pub struct SpeechDetector {
    detector: VoiceActivityDetector,
    sample_rate: u32,
    threshold: f32,
}

impl SpeechDetector {
    /// Create a detector. Only 8 kHz and 16 kHz are supported.
    pub fn new(sample_rate: u32, threshold: f32) -> Result<Self> {
        if ![8000, 16000].contains(&sample_rate) {
            return Err(ParleyError::ConfigError(format!(
                "Invalid VAD sample rate: {}. Must be 8000 or 16000",
                sample_rate
            )));
        }

        let chunk_size = Self::chunk_size_for(sample_rate);

        let detector = VoiceActivityDetector::builder()
            .sample_rate(sample_rate as i32)
            .chunk_size(chunk_size)
            .build()
            .map_err(|e| {
                ParleyError::AudioProcessingError(format!("Failed to create VAD: {:?}", e))
            })?;

        Ok(Self {
            detector,
            sample_rate,
            threshold: threshold.clamp(0.0, 1.0),
        })
    }

    pub fn default_16khz() -> Result<Self> {
        Self::new(16000, 0.5)
    }

    /// Whether the chunk contains speech.
    pub fn is_speech(&mut self, chunk: &[f32]) -> bool {
        self.detector.predict(chunk.iter().copied()) >= self.threshold
    }

    pub fn probability(&mut self, chunk: &[f32]) -> f32 {
        self.detector.predict(chunk.iter().copied())
    }

    /// Reset internal state between sessions.
    pub fn reset(&mut self) {
        self.detector.reset();
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Chunk size the detector expects (32 ms windows).
    pub fn chunk_size(&self) -> usize {
        Self::chunk_size_for(self.sample_rate)
    }

    fn chunk_size_for(sample_rate: u32) -> usize {
        match sample_rate {
            8000 => 256,
            _ => 512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_creation() {
        assert!(SpeechDetector::new(16000, 0.5).is_ok());
    }

    #[test]
    fn test_invalid_sample_rate() {
        assert!(SpeechDetector::new(44100, 0.5).is_err());
    }

    #[test]
    fn test_silence_not_speech() {
        if let Ok(mut vad) = SpeechDetector::default_16khz() {
            let silence = vec![0.0f32; 512];
            assert!(!vad.is_speech(&silence));
        }
    }

    #[test]
    fn test_chunk_size() {
        if let Ok(vad) = SpeechDetector::new(16000, 0.5) {
            assert_eq!(vad.chunk_size(), 512);
        }
        if let Ok(vad) = SpeechDetector::new(8000, 0.5) {
            assert_eq!(vad.chunk_size(), 256);
        }
    }

    #[test]
    fn test_threshold_clamped() {
        if let Ok(vad) = SpeechDetector::new(16000, 1.7) {
            assert_eq!(vad.threshold(), 1.0);
        }
    }
}
