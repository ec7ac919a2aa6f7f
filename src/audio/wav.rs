use crate::{ParleyError, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use tracing::debug;

/// Read a WAV file into f32 samples.
///
/// Returns (samples, sample_rate, channels); samples stay interleaved.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32, u16)> {
    let mut reader = WavReader::open(path.as_ref())
        .map_err(|e| ParleyError::IOError(format!("Failed to open WAV file: {}", e)))?;

    let spec = reader.spec();

    debug!(
        "Reading WAV file {:?}: {} Hz, {} channels, {} bits",
        path.as_ref(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample
    );

    let samples: Result<Vec<f32>> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map_err(|e| ParleyError::IOError(format!("Failed to read sample: {}", e))))
            .collect(),
        SampleFormat::Int => match spec.bits_per_sample {
            16 => reader
                .samples::<i16>()
                .map(|s| {
                    s.map(|v| v as f32 / i16::MAX as f32)
                        .map_err(|e| ParleyError::IOError(format!("Failed to read sample: {}", e)))
                })
                .collect(),
            24 => reader
                .samples::<i32>()
                .map(|s| {
                    s.map(|v| v as f32 / 8388608.0) // 2^23
                        .map_err(|e| ParleyError::IOError(format!("Failed to read sample: {}", e)))
                })
                .collect(),
            32 => reader
                .samples::<i32>()
                .map(|s| {
                    s.map(|v| v as f32 / i32::MAX as f32)
                        .map_err(|e| ParleyError::IOError(format!("Failed to read sample: {}", e)))
                })
                .collect(),
            other => {
                return Err(ParleyError::AudioProcessingError(format!(
                    "Unsupported bit depth: {}",
                    other
                )))
            }
        },
    };

    Ok((samples?, spec.sample_rate, spec.channels))
}

/// Downmix interleaved multi-channel audio to mono by averaging frames.
pub fn downmix_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let channels = channels as usize;
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
