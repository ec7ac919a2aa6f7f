use crate::audio::resampler::resample;
use crate::audio::wav::{downmix_mono, read_wav};
use crate::Result;
use crossbeam_channel::Sender;
use std::path::Path;
use tracing::{debug, warn};

/// Which notification sound to play for a list change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    /// Newest message was sent by the current user
    Send,
    /// Newest message arrived from the peer
    Receive,
}

/// Short notification sounds for message activity.
///
/// `send.wav` and `receive.wav` are loaded once, downmixed to mono and
/// resampled to the output device rate. A missing or unreadable file
/// degrades to silence for that cue.
pub struct MessageCues {
    send: Vec<f32>,
    receive: Vec<f32>,
}

impl MessageCues {
    /// Load cue sounds from `dir`, preparing them for `output_rate` playback.
    pub fn load<P: AsRef<Path>>(dir: P, output_rate: u32) -> Self {
        let dir = dir.as_ref();
        Self {
            send: Self::load_cue(&dir.join("send.wav"), output_rate),
            receive: Self::load_cue(&dir.join("receive.wav"), output_rate),
        }
    }

    fn load_cue(path: &Path, output_rate: u32) -> Vec<f32> {
        match Self::read_prepared(path, output_rate) {
            Ok(samples) => {
                debug!("Loaded cue {:?} ({} samples)", path, samples.len());
                samples
            }
            Err(e) => {
                warn!("Cue sound {:?} unavailable: {}", path, e);
                Vec::new()
            }
        }
    }

    fn read_prepared(path: &Path, output_rate: u32) -> Result<Vec<f32>> {
        let (samples, rate, channels) = read_wav(path)?;
        let mono = downmix_mono(&samples, channels);
        resample(&mono, rate, output_rate)
    }

    /// Queue the cue on the playback channel. A full or disconnected
    /// channel drops the cue; it is a UI nicety, not a delivery.
    pub fn play(&self, kind: CueKind, playback_tx: &Sender<Vec<f32>>) {
        let samples = match kind {
            CueKind::Send => &self.send,
            CueKind::Receive => &self.receive,
        };
        if samples.is_empty() {
            return;
        }
        if playback_tx.try_send(samples.clone()).is_err() {
            debug!("Dropped {:?} cue: playback channel unavailable", kind);
        }
    }

    pub fn has_cue(&self, kind: CueKind) -> bool {
        match kind {
            CueKind::Send => !self.send.is_empty(),
            CueKind::Receive => !self.receive.is_empty(),
        }
    }
}
