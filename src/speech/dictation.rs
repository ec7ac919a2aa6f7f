//! Dictation lifecycle for the composer
//!
//! The controller owns its recognition engine and runs an explicit
//! two-state machine. The one interesting transition is the guarded
//! restart: an `End` event that arrives while the logical state is
//! still `Listening` means the underlying session died on its own, and
//! the controller brings it back; an `End` after the user stopped is
//! acknowledged silently.

use crate::speech::recognition::{RecognitionEngine, RecognitionEvent, RecognitionResult};
use crate::Result;
use crossbeam_channel::Receiver;
use tracing::{debug, error, warn};

/// Logical dictation state, independent of session churn underneath
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictationState {
    /// Microphone off, no session wanted
    Idle,
    /// Microphone on; a session should exist at all times
    Listening,
}

/// Owns a recognition engine for the lifetime of one input surface.
///
/// Dropping the controller stops any active session, so no result can
/// land after the surface is gone.
pub struct DictationController {
    engine: Box<dyn RecognitionEngine>,
    events: Receiver<RecognitionEvent>,
    state: DictationState,
    restarts: u64,
}

impl DictationController {
    pub fn new(engine: Box<dyn RecognitionEngine>) -> Self {
        let events = engine.events();
        Self {
            engine,
            events,
            state: DictationState::Idle,
            restarts: 0,
        }
    }

    pub fn state(&self) -> DictationState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == DictationState::Listening
    }

    /// Number of self-healing session restarts since creation
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Flip between `Idle` and `Listening`.
    pub fn toggle(&mut self) -> Result<()> {
        match self.state {
            DictationState::Idle => self.start(),
            DictationState::Listening => {
                self.stop();
                Ok(())
            }
        }
    }

    /// `Idle -> Listening`: start a session. A second start while
    /// listening is refused by the guard, never forwarded to the engine.
    pub fn start(&mut self) -> Result<()> {
        if self.state == DictationState::Listening {
            warn!("Dictation already listening, ignoring start");
            return Ok(());
        }
        self.engine.start()?;
        self.state = DictationState::Listening;
        debug!("Dictation started");
        Ok(())
    }

    /// `Listening -> Idle`: stop the session. The state changes before
    /// the engine is told to stop, so the trailing `End` event is
    /// treated as acknowledged rather than as churn.
    pub fn stop(&mut self) {
        if self.state == DictationState::Idle {
            return;
        }
        self.state = DictationState::Idle;
        self.engine.stop();
        debug!("Dictation stopped");
    }

    /// Drain pending session events.
    ///
    /// Returns the most recent assembled transcript, which replaces the
    /// draft text wholesale. Recognition errors are logged and skipped.
    pub fn poll(&mut self) -> Option<String> {
        let mut latest = None;

        while let Ok(event) = self.events.try_recv() {
            match event {
                RecognitionEvent::Results(results) => {
                    latest = Some(assemble_transcript(&results));
                }
                RecognitionEvent::Error(e) => {
                    warn!("Speech recognition error: {}", e);
                }
                RecognitionEvent::End => {
                    if self.state == DictationState::Listening {
                        debug!("Recognition session ended on its own, restarting");
                        match self.engine.start() {
                            Ok(()) => self.restarts += 1,
                            Err(e) => {
                                error!("Failed to restart recognition session: {}", e);
                                self.state = DictationState::Idle;
                            }
                        }
                    } else {
                        debug!("Recognition session ended");
                    }
                }
            }
        }

        latest
    }
}

impl Drop for DictationController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Concatenate the top alternative of every buffered result, in result
/// order, into the transcript that overwrites the draft.
fn assemble_transcript(results: &[RecognitionResult]) -> String {
    results.iter().filter_map(|r| r.top()).collect()
}
