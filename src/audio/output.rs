use crate::{ParleyError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Speaker output fed by a sample channel.
///
/// Chunks received on the channel are appended to a shared pending
/// buffer that the stream callback drains. `flush()` discards whatever
/// has not reached the device yet, which is how utterance cancellation
/// cuts playback mid-stream.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    is_playing: Arc<Mutex<bool>>,
    pending: Arc<Mutex<Vec<f32>>>,
}

impl AudioOutput {
    /// Open the default output device.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| ParleyError::AudioDeviceError("No output device available".into()))?;

        info!(
            "Using output device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_output_config()
            .map_err(|e| {
                ParleyError::AudioDeviceError(format!("Failed to get output config: {}", e))
            })?
            .into();

        Ok(Self {
            device,
            config,
            stream: None,
            is_playing: Arc::new(Mutex::new(false)),
            pending: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Sample rate the device expects; callers resample to this.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Start the output stream, playing mono chunks received on `audio_rx`.
    pub fn start_playback(&mut self, audio_rx: Receiver<Vec<f32>>) -> Result<()> {
        if *self.is_playing.lock() {
            warn!("Already playing");
            return Ok(());
        }

        let channels = self.config.channels as usize;
        let is_playing = Arc::clone(&self.is_playing);
        let pending = Arc::clone(&self.pending);
        let feeder_pending = Arc::clone(&self.pending);

        // Feeder thread: move received chunks into the shared buffer
        std::thread::spawn(move || {
            while let Ok(samples) = audio_rx.recv() {
                feeder_pending.lock().extend_from_slice(&samples);
            }
        });

        let err_fn = |err| {
            error!("Audio output stream error: {}", err);
        };

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !*is_playing.lock() {
                        data.fill(0.0);
                        return;
                    }

                    let mut buf = pending.lock();
                    let frames_needed = data.len() / channels;
                    let frames_available = buf.len().min(frames_needed);

                    for i in 0..frames_available {
                        let sample = buf[i];
                        for c in 0..channels {
                            data[i * channels + c] = sample;
                        }
                    }
                    buf.drain(0..frames_available);

                    for value in data.iter_mut().skip(frames_available * channels) {
                        *value = 0.0;
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| {
                ParleyError::AudioDeviceError(format!("Failed to build output stream: {}", e))
            })?;

        stream.play().map_err(|e| {
            ParleyError::AudioDeviceError(format!("Failed to start output stream: {}", e))
        })?;

        *self.is_playing.lock() = true;
        self.stream = Some(stream);

        info!("Started audio playback");
        Ok(())
    }

    /// Discard samples not yet delivered to the device.
    pub fn flush(&self) {
        self.pending.lock().clear();
    }

    /// Number of mono samples still queued for the device.
    pub fn pending_samples(&self) -> usize {
        self.pending.lock().len()
    }

    /// Stop the stream and drop queued audio.
    pub fn stop_playback(&mut self) {
        *self.is_playing.lock() = false;
        self.flush();

        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("Stopped audio playback");
        }
    }

    pub fn is_playing(&self) -> bool {
        *self.is_playing.lock()
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop_playback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_audio_output_creation() {
        // This test might fail in CI environments without audio devices
        if let Ok(output) = AudioOutput::new() {
            assert!(output.sample_rate() > 0);
            assert!(output.channels() > 0);
        }
    }

    #[test]
    fn test_playback_state_and_flush() {
        if let Ok(mut output) = AudioOutput::new() {
            assert!(!output.is_playing());

            let (tx, rx) = bounded(10);
            if output.start_playback(rx).is_ok() {
                assert!(output.is_playing());

                let _ = tx.send(vec![0.0f32; 4096]);
                std::thread::sleep(std::time::Duration::from_millis(20));
                output.flush();
                assert_eq!(output.pending_samples(), 0);

                output.stop_playback();
                assert!(!output.is_playing());
            }
        }
    }
}
