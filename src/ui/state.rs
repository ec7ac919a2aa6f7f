//! Application state management
//!
//! Central state for the chat UI: the chat store handle, the composer,
//! the dictation controller and utterance player (when their engines
//! are available), the task list, and the small bits of view state the
//! header toggles control. `poll_events` drains every worker channel
//! once per frame.

use crate::audio::{CueKind, MessageCues};
use crate::chat::{AuthState, ChatPeer, ChatStore, Message, StoreEvent};
use crate::composer::Composer;
use crate::speech::{DictationController, UtterancePlayer};
use crate::tasks::TaskStore;
use crossbeam_channel::Sender;
use std::time::{Duration, Instant};
use tracing::{error, warn};
use uuid::Uuid;

/// Which panel fills the content area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelView {
    Messages,
    Todo,
}

/// What the header row shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    Normal,
    Search,
}

/// How long the copy confirmation stays visible
const COPY_CONFIRM_DURATION: Duration = Duration::from_secs(3);

/// How long transient notices stay visible
const NOTICE_DURATION: Duration = Duration::from_secs(4);

struct CopiedMessage {
    id: Uuid,
    at: Instant,
}

struct Notice {
    text: String,
    at: Instant,
}

/// Central application state
pub struct AppState {
    /// Current user identity and presence
    pub auth: AuthState,

    /// The conversation partner
    pub peer: ChatPeer,

    /// Reactive message list and send path
    pub chat: ChatStore,

    /// Draft text and pending attachment
    pub composer: Composer,

    /// To-do list with persistence
    pub tasks: TaskStore,

    /// Dictation controller, when a recognition engine is available
    pub dictation: Option<DictationController>,

    /// Utterance player, when synthesis is available
    pub player: Option<UtterancePlayer>,

    /// Content area selection
    pub panel: PanelView,

    /// Header row mode
    pub header: HeaderMode,

    /// Live search term filtering the message list
    pub search_term: String,

    /// Text in the task panel's add field
    pub task_input: String,

    cues: Option<MessageCues>,
    cue_tx: Option<Sender<Vec<f32>>>,
    copied: Option<CopiedMessage>,
    notice: Option<Notice>,
    focus_search: bool,
    last_message_id: Option<Uuid>,
    clipboard: Option<arboard::Clipboard>,
}

impl AppState {
    pub fn new(auth: AuthState, peer: ChatPeer, chat: ChatStore, tasks: TaskStore) -> Self {
        Self {
            auth,
            peer,
            chat,
            composer: Composer::new(),
            tasks,
            dictation: None,
            player: None,
            panel: PanelView::Messages,
            header: HeaderMode::Normal,
            search_term: String::new(),
            task_input: String::new(),
            cues: None,
            cue_tx: None,
            copied: None,
            notice: None,
            focus_search: false,
            last_message_id: None,
            clipboard: None,
        }
    }

    pub fn with_dictation(mut self, controller: DictationController) -> Self {
        self.dictation = Some(controller);
        self
    }

    pub fn with_player(mut self, player: UtterancePlayer) -> Self {
        self.player = Some(player);
        self
    }

    pub fn with_cues(mut self, cues: MessageCues, cue_tx: Sender<Vec<f32>>) -> Self {
        self.cues = Some(cues);
        self.cue_tx = Some(cue_tx);
        self
    }

    // --- panel and header toggles ---

    pub fn toggle_panel(&mut self) {
        self.panel = match self.panel {
            PanelView::Messages => PanelView::Todo,
            PanelView::Todo => PanelView::Messages,
        };
    }

    /// Flip between the normal header and the search header. Activating
    /// search always starts from an empty term.
    pub fn toggle_search(&mut self) {
        self.header = match self.header {
            HeaderMode::Normal => {
                self.search_term.clear();
                self.focus_search = true;
                HeaderMode::Search
            }
            HeaderMode::Search => HeaderMode::Normal,
        };
    }

    /// One-shot focus request for the search field
    pub fn take_search_focus(&mut self) -> bool {
        std::mem::take(&mut self.focus_search)
    }

    /// Messages passing the current search term, in list order
    pub fn filtered_messages(&self) -> Vec<Message> {
        self.chat
            .messages()
            .iter()
            .filter(|m| m.matches_search(&self.search_term))
            .cloned()
            .collect()
    }

    // --- composing and sending ---

    /// Submit the draft. A draft with neither text nor image is a
    /// no-op; otherwise the payload goes to the store and the draft is
    /// cleared once the send is confirmed.
    pub fn submit(&mut self) {
        let Some(payload) = self.composer.payload() else {
            return;
        };
        let sender_id = self.auth.user_id.clone();
        self.chat.send_message(&sender_id, payload);
    }

    pub fn toggle_dictation(&mut self) {
        let Some(dictation) = &mut self.dictation else {
            return;
        };
        if let Err(e) = dictation.toggle() {
            error!("Failed to toggle dictation: {}", e);
            self.set_notice(e.user_message());
        }
    }

    pub fn is_listening(&self) -> bool {
        self.dictation
            .as_ref()
            .map(|d| d.is_listening())
            .unwrap_or(false)
    }

    /// Attach a picked file to the draft; non-images surface a notice.
    pub fn attach_image_file(&mut self, path: std::path::PathBuf) {
        if let Err(e) = self.composer.attach_image(path) {
            warn!("Attachment rejected: {}", e);
            self.set_notice(e.user_message());
        }
    }

    // --- per-message actions ---

    pub fn toggle_playback(&mut self, text: &str) {
        if let Some(player) = &mut self.player {
            player.toggle(text);
        }
    }

    pub fn playing_text(&self) -> Option<&str> {
        self.player.as_ref().and_then(|p| p.playing_text())
    }

    /// Copy message text to the system clipboard, confirming visually
    /// for a fixed duration on success. Failures are logged only.
    pub fn copy_message(&mut self, id: Uuid, text: &str) {
        if self.clipboard.is_none() {
            match arboard::Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    error!("Failed to copy text: {}", e);
                    return;
                }
            }
        }

        if let Some(clipboard) = &mut self.clipboard {
            match clipboard.set_text(text.to_string()) {
                Ok(()) => {
                    self.copied = Some(CopiedMessage {
                        id,
                        at: Instant::now(),
                    });
                }
                Err(e) => error!("Failed to copy text: {}", e),
            }
        }
    }

    pub fn is_copied(&self, id: Uuid) -> bool {
        self.copied
            .as_ref()
            .map(|c| c.id == id && c.at.elapsed() < COPY_CONFIRM_DURATION)
            .unwrap_or(false)
    }

    // --- tasks ---

    /// Add the task panel's input as a new task; blank input is a no-op
    /// but the field is cleared either way.
    pub fn add_task(&mut self) {
        let text = std::mem::take(&mut self.task_input);
        self.tasks.add(&text);
    }

    pub fn toggle_task(&mut self, index: usize) {
        self.tasks.toggle(index);
    }

    pub fn delete_task(&mut self, index: usize) {
        self.tasks.delete(index);
    }

    // --- notices ---

    pub fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            at: Instant::now(),
        });
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_ref().map(|n| n.text.as_str())
    }

    // --- frame tick ---

    /// Drain all worker channels; called once per frame.
    pub fn poll_events(&mut self) {
        // Dictation results replace the draft text wholesale
        if let Some(dictation) = &mut self.dictation {
            if let Some(transcript) = dictation.poll() {
                self.composer.set_text(transcript);
            }
        }

        // Attachment decodes
        if let Some(e) = self.composer.poll() {
            self.set_notice(e.user_message());
        }

        // Chat store events: the draft clears only on a confirmed send
        for event in self.chat.poll() {
            if matches!(event, StoreEvent::Sent(_)) {
                self.composer.clear();
            }
        }

        // One cue per list change, chosen by the newest sender
        if let Some(kind) = self.detect_list_change() {
            if let (Some(cues), Some(tx)) = (&self.cues, &self.cue_tx) {
                cues.play(kind, tx);
            }
        }

        if let Some(player) = &mut self.player {
            player.poll();
        }

        // Expire transient indicators
        if let Some(copied) = &self.copied {
            if copied.at.elapsed() >= COPY_CONFIRM_DURATION {
                self.copied = None;
            }
        }
        if let Some(notice) = &self.notice {
            if notice.at.elapsed() >= NOTICE_DURATION {
                self.notice = None;
            }
        }
    }

    /// Whether the newest message changed since the last frame, and
    /// which cue that change calls for.
    fn detect_list_change(&mut self) -> Option<CueKind> {
        let newest = self.chat.messages().last()?;
        if Some(newest.id) == self.last_message_id {
            return None;
        }
        self.last_message_id = Some(newest.id);

        if newest.sender_id == self.auth.user_id {
            Some(CueKind::Send)
        } else {
            Some(CueKind::Receive)
        }
    }

    /// Release everything with a session or worker attached.
    pub fn teardown(&mut self) {
        // Dropping the controller stops any active recognition session
        self.dictation = None;

        if let Some(player) = &mut self.player {
            player.shutdown();
        }
        self.player = None;

        self.chat.unsubscribe();
        self.chat.shutdown();
    }
}
