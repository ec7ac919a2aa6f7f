//! Single-utterance playback
//!
//! The player enforces the "at most one utterance" contract: playing a
//! new text cancels whatever is in flight first, and selecting the text
//! that is already playing stops it instead of queueing it again.

use crate::audio::resampler::resample;
use crate::speech::synthesis::{SynthesisCommand, SynthesisEvent, Voice, VoiceCatalog};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Playback destination for synthesized samples.
///
/// `flush` discards queued-but-unplayed audio, which is what makes
/// cancellation cut the sound immediately rather than at a buffer
/// boundary.
pub trait AudioSink {
    fn queue(&self, samples: &[f32]);
    fn flush(&self);
    fn pending(&self) -> usize;
    fn sample_rate(&self) -> u32;
}

#[cfg(feature = "audio-io")]
pub use speaker::SpeakerSink;

#[cfg(feature = "audio-io")]
mod speaker {
    use super::AudioSink;
    use crate::audio::AudioOutput;
    use crate::Result;
    use crossbeam_channel::{unbounded, Sender};

    /// Sink backed by a dedicated output stream.
    pub struct SpeakerSink {
        output: AudioOutput,
        tx: Sender<Vec<f32>>,
    }

    impl SpeakerSink {
        pub fn new() -> Result<Self> {
            let mut output = AudioOutput::new()?;
            let (tx, rx) = unbounded();
            output.start_playback(rx)?;
            Ok(Self { output, tx })
        }
    }

    impl AudioSink for SpeakerSink {
        fn queue(&self, samples: &[f32]) {
            let _ = self.tx.send(samples.to_vec());
        }

        fn flush(&self) {
            self.output.flush();
        }

        fn pending(&self) -> usize {
            self.output.pending_samples()
        }

        fn sample_rate(&self) -> u32 {
            self.output.sample_rate()
        }
    }
}

struct ActiveUtterance {
    id: Uuid,
    text: String,
    synthesis_done: bool,
}

/// Plays one message text aloud at a time.
pub struct UtterancePlayer {
    command_tx: Sender<SynthesisCommand>,
    event_rx: Receiver<SynthesisEvent>,
    sink: Option<Box<dyn AudioSink>>,
    voice: Option<Voice>,
    current: Option<ActiveUtterance>,
}

impl UtterancePlayer {
    pub fn new(
        catalog: &VoiceCatalog,
        command_tx: Sender<SynthesisCommand>,
        event_rx: Receiver<SynthesisEvent>,
    ) -> Self {
        let voice = catalog.select_default().cloned();
        if let Some(v) = &voice {
            debug!("Selected voice: {} (speaker {})", v.name, v.speaker_id);
        } else {
            warn!("No synthesis voices available");
        }

        Self {
            command_tx,
            event_rx,
            sink: None,
            voice,
            current: None,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn AudioSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    /// Text currently being spoken, if any.
    pub fn playing_text(&self) -> Option<&str> {
        self.current.as_ref().map(|u| u.text.as_str())
    }

    pub fn is_playing(&self, text: &str) -> bool {
        self.playing_text() == Some(text)
    }

    /// Toggle playback: the already-playing text stops, anything else
    /// cancels the current utterance and starts fresh.
    pub fn toggle(&mut self, text: &str) {
        if self.is_playing(text) {
            self.stop();
        } else {
            self.speak(text);
        }
    }

    /// Start speaking `text`, cancelling any utterance in flight first.
    pub fn speak(&mut self, text: &str) {
        self.stop();

        let speaker_id = self.voice.as_ref().map(|v| v.speaker_id).unwrap_or(0);
        let utterance_id = Uuid::new_v4();

        if self
            .command_tx
            .try_send(SynthesisCommand::Speak {
                text: text.to_string(),
                speaker_id,
                utterance_id,
            })
            .is_err()
        {
            error!("Synthesis worker unavailable, cannot speak");
            return;
        }

        self.current = Some(ActiveUtterance {
            id: utterance_id,
            text: text.to_string(),
            synthesis_done: false,
        });
    }

    /// Cancel the current utterance immediately.
    pub fn stop(&mut self) {
        if self.current.take().is_some() {
            if let Some(sink) = &self.sink {
                sink.flush();
            }
            debug!("Utterance cancelled");
        }
    }

    /// Drain synthesis events and track utterance completion.
    pub fn poll(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                SynthesisEvent::Audio(audio) => {
                    let current_id = self.current.as_ref().map(|u| u.id);
                    if current_id != Some(audio.utterance_id) {
                        // Superseded utterance; drop its audio
                        continue;
                    }
                    if let Some(sink) = &self.sink {
                        if audio.sample_rate == sink.sample_rate() {
                            sink.queue(&audio.samples);
                        } else {
                            match resample(&audio.samples, audio.sample_rate, sink.sample_rate())
                            {
                                Ok(samples) => sink.queue(&samples),
                                Err(e) => {
                                    error!("Failed to resample utterance audio: {}", e);
                                    self.current = None;
                                }
                            }
                        }
                    }
                }
                SynthesisEvent::Finished { utterance_id } => {
                    if let Some(current) = &mut self.current {
                        if current.id == utterance_id {
                            current.synthesis_done = true;
                        }
                    }
                }
                SynthesisEvent::Error {
                    error,
                    utterance_id,
                } => {
                    error!("Synthesis error: {}", error);
                    let matches = self
                        .current
                        .as_ref()
                        .map(|u| utterance_id.is_none() || utterance_id == Some(u.id))
                        .unwrap_or(false);
                    if matches {
                        self.current = None;
                    }
                }
                SynthesisEvent::Shutdown => {
                    self.current = None;
                }
            }
        }

        // The utterance is over once synthesis finished and the sink has
        // drained. Without a sink there is nothing left to wait for.
        if let Some(current) = &self.current {
            if current.synthesis_done {
                let drained = self.sink.as_ref().map(|s| s.pending() == 0).unwrap_or(true);
                if drained {
                    self.current = None;
                }
            }
        }
    }

    /// Stop playback and shut the synthesis worker down.
    pub fn shutdown(&mut self) {
        self.stop();
        let _ = self.command_tx.try_send(SynthesisCommand::Shutdown);
    }
}

impl Drop for UtterancePlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::synthesis::UtteranceAudio;
    use crossbeam_channel::bounded;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct MockSinkState {
        queued: Vec<Vec<f32>>,
        flushes: usize,
        pending: usize,
    }

    #[derive(Clone, Default)]
    struct MockSink {
        state: Arc<Mutex<MockSinkState>>,
    }

    impl AudioSink for MockSink {
        fn queue(&self, samples: &[f32]) {
            let mut state = self.state.lock();
            state.pending += samples.len();
            state.queued.push(samples.to_vec());
        }

        fn flush(&self) {
            let mut state = self.state.lock();
            state.flushes += 1;
            state.pending = 0;
        }

        fn pending(&self) -> usize {
            self.state.lock().pending
        }

        fn sample_rate(&self) -> u32 {
            22050
        }
    }

    fn player_with_mock() -> (
        UtterancePlayer,
        MockSink,
        Receiver<SynthesisCommand>,
        Sender<SynthesisEvent>,
    ) {
        let (command_tx, command_rx) = bounded(16);
        let (event_tx, event_rx) = bounded(16);
        let catalog = VoiceCatalog::new(vec![
            Voice::new("en-default", 0),
            Voice::new("en-female", 3),
        ]);
        let sink = MockSink::default();
        let player = UtterancePlayer::new(&catalog, command_tx, event_rx)
            .with_sink(Box::new(sink.clone()));
        (player, sink, command_rx, event_tx)
    }

    fn sent_speak(command_rx: &Receiver<SynthesisCommand>) -> (String, i32, Uuid) {
        match command_rx.try_recv().unwrap() {
            SynthesisCommand::Speak {
                text,
                speaker_id,
                utterance_id,
            } => (text, speaker_id, utterance_id),
            other => panic!("Expected Speak, got {:?}", other),
        }
    }

    #[test]
    fn test_uses_policy_selected_voice() {
        let (mut player, _sink, command_rx, _event_tx) = player_with_mock();
        assert_eq!(player.voice().unwrap().speaker_id, 3);

        player.speak("hello");
        let (_, speaker_id, _) = sent_speak(&command_rx);
        assert_eq!(speaker_id, 3);
    }

    #[test]
    fn test_toggle_same_text_twice_stops() {
        let (mut player, sink, _command_rx, _event_tx) = player_with_mock();

        player.toggle("hello there");
        assert!(player.is_playing("hello there"));

        player.toggle("hello there");
        assert!(player.playing_text().is_none());
        assert_eq!(sink.state.lock().flushes, 1);
    }

    #[test]
    fn test_different_text_cancels_before_starting() {
        let (mut player, sink, command_rx, _event_tx) = player_with_mock();

        player.toggle("first");
        let (text, _, first_id) = sent_speak(&command_rx);
        assert_eq!(text, "first");

        player.toggle("second");
        assert!(player.is_playing("second"));
        // The in-flight utterance was flushed before the new one started
        assert_eq!(sink.state.lock().flushes, 1);
        let (text, _, second_id) = sent_speak(&command_rx);
        assert_eq!(text, "second");
        assert_ne!(first_id, second_id);
    }

    #[test]
    fn test_stale_audio_dropped() {
        let (mut player, sink, command_rx, event_tx) = player_with_mock();

        player.speak("first");
        let (_, _, first_id) = sent_speak(&command_rx);
        player.speak("second");
        let _ = sent_speak(&command_rx);

        // Audio for the superseded utterance arrives late
        event_tx
            .send(SynthesisEvent::Audio(UtteranceAudio {
                samples: vec![0.1; 100],
                sample_rate: 22050,
                utterance_id: first_id,
            }))
            .unwrap();
        player.poll();

        assert!(sink.state.lock().queued.is_empty());
        assert!(player.is_playing("second"));
    }

    #[test]
    fn test_current_audio_queued_and_completion_tracked() {
        let (mut player, sink, command_rx, event_tx) = player_with_mock();

        player.speak("read me");
        let (_, _, id) = sent_speak(&command_rx);

        event_tx
            .send(SynthesisEvent::Audio(UtteranceAudio {
                samples: vec![0.1; 512],
                sample_rate: 22050,
                utterance_id: id,
            }))
            .unwrap();
        event_tx
            .send(SynthesisEvent::Finished { utterance_id: id })
            .unwrap();
        player.poll();

        // Audio queued; still counts as playing until the sink drains
        assert_eq!(sink.state.lock().queued.len(), 1);
        assert!(player.is_playing("read me"));

        sink.state.lock().pending = 0;
        player.poll();
        assert!(player.playing_text().is_none());
    }

    #[test]
    fn test_synthesis_error_clears_playback_state() {
        let (mut player, _sink, command_rx, event_tx) = player_with_mock();

        player.speak("broken");
        let (_, _, id) = sent_speak(&command_rx);

        event_tx
            .send(SynthesisEvent::Error {
                error: "model exploded".into(),
                utterance_id: Some(id),
            })
            .unwrap();
        player.poll();

        assert!(player.playing_text().is_none());
    }

    #[test]
    fn test_shutdown_sends_worker_shutdown() {
        let (mut player, _sink, command_rx, _event_tx) = player_with_mock();

        player.speak("bye");
        let _ = sent_speak(&command_rx);

        player.shutdown();
        assert!(matches!(
            command_rx.try_recv().unwrap(),
            SynthesisCommand::Shutdown
        ));
    }
}
