use crate::{ParleyError, Result};
use rubato::{
    Resampler as _, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};
use tracing::debug;

/// Mono sample-rate converter.
///
/// Every audio path in this crate is mono by the time it is resampled
/// (microphone capture is downmixed in the input callback, synthesis
/// output is mono), so the converter only handles a single channel.
pub struct Resampler {
    inner: SincFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,
}

impl Resampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(ParleyError::ConfigError(
                "Sample rates must be greater than 0".into(),
            ));
        }

        let ratio = output_rate as f64 / input_rate as f64;

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        // Fixed input chunk size; shorter tails are zero-padded.
        let chunk_size = 1024;

        let inner = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1).map_err(|e| {
            ParleyError::AudioProcessingError(format!("Failed to create resampler: {}", e))
        })?;

        debug!("Created resampler: {} Hz -> {} Hz", input_rate, output_rate);

        Ok(Self {
            inner,
            input_rate,
            output_rate,
        })
    }

    /// Resample a mono buffer.
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = self.inner.input_frames_max();
        let ratio = self.output_rate as f64 / self.input_rate as f64;
        let mut output = Vec::with_capacity((input.len() as f64 * ratio * 1.1) as usize);

        let mut offset = 0;
        while offset < input.len() {
            let remaining = input.len() - offset;
            let take = remaining.min(chunk_size);

            let mut chunk = vec![0.0f32; chunk_size];
            chunk[..take].copy_from_slice(&input[offset..offset + take]);

            let processed = self.inner.process(&[chunk], None).map_err(|e| {
                ParleyError::AudioProcessingError(format!("Resampling failed: {}", e))
            })?;

            let produced = processed[0].len();
            // On a padded tail, only keep output corresponding to real input
            let keep = if remaining < chunk_size {
                ((take as f64) * ratio).ceil() as usize
            } else {
                produced
            };
            output.extend_from_slice(&processed[0][..keep.min(produced)]);

            offset += take;
        }

        Ok(output)
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

/// One-shot mono resampling; passthrough when rates already match.
pub fn resample(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    if input_rate == output_rate {
        return Ok(input.to_vec());
    }

    let mut resampler = Resampler::new(input_rate, output_rate)?;
    resampler.process(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resampler_creation() {
        assert!(Resampler::new(48000, 16000).is_ok());
    }

    #[test]
    fn test_invalid_rates() {
        assert!(Resampler::new(0, 16000).is_err());
        assert!(Resampler::new(16000, 0).is_err());
    }

    #[test]
    fn test_downsampling_length() {
        let mut resampler = Resampler::new(48000, 16000).unwrap();
        let input: Vec<f32> = (0..4800).map(|i| (i as f32 * 0.01).sin()).collect();
        let output = resampler.process(&input).unwrap();
        assert!(!output.is_empty());
        assert!(output.len() < input.len());
    }

    #[test]
    fn test_upsampling_length() {
        let mut resampler = Resampler::new(16000, 48000).unwrap();
        let input: Vec<f32> = (0..1024).map(|i| (i as f32 * 0.01).sin()).collect();
        let output = resampler.process(&input).unwrap();
        assert!(output.len() > input.len() * 2);
    }

    #[test]
    fn test_empty_input() {
        let mut resampler = Resampler::new(16000, 48000).unwrap();
        assert!(resampler.process(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_passthrough() {
        let input = vec![0.5f32; 256];
        let output = resample(&input, 16000, 16000).unwrap();
        assert_eq!(output, input);
    }
}
