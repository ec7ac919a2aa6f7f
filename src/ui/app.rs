//! Main application struct and eframe integration

use crate::chat::{AuthState, ChatStore, LocalTransport};
use crate::config::AppConfig;
use crate::tasks::{FileStore, TaskStore};
use crate::ui::components::{ChatHeader, InputBar, MessageList, TodoPanel};
use crate::ui::state::{AppState, PanelView};
use crate::ui::theme::Theme;
use egui::{self, CentralPanel, RichText, TopBottomPanel};
use std::time::Duration;

#[cfg(feature = "audio-io")]
use crate::audio::{AudioOutput, MessageCues};
#[cfg(feature = "audio-io")]
use crate::speech::player::{AudioSink, SpeakerSink};
#[cfg(feature = "audio-io")]
use crate::speech::recognition::WhisperRecognizer;
#[cfg(feature = "audio-io")]
use crate::speech::{DictationController, SynthesisPipeline, UtterancePlayer};
#[cfg(feature = "audio-io")]
use tracing::warn;

/// Main chat client application
pub struct ParleyApp {
    state: AppState,
    theme: Theme,
    peer_id: String,
    initialized: bool,

    /// Output stream for message cue sounds; kept alive with the app
    #[cfg(feature = "audio-io")]
    _cue_output: Option<AudioOutput>,
}

impl ParleyApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let theme = Theme::dark();
        theme.apply(&cc.egui_ctx);

        let peer_id = config.peer.id.clone();

        let auth = AuthState::new(config.user_id.clone())
            .with_online(&[config.user_id.as_str(), config.peer.id.as_str()]);

        let (transport, _inbox) = LocalTransport::new();
        let transport = transport.with_echo_peer(config.peer.id.clone());
        let chat = ChatStore::spawn(Box::new(transport));

        let tasks = TaskStore::load(Box::new(FileStore::new(config.data_dir.clone())));

        let mut state = AppState::new(auth, config.peer.clone(), chat, tasks);

        #[cfg(feature = "audio-io")]
        let mut cue_output = None;

        #[cfg(feature = "audio-io")]
        {
            if config.enable_dictation {
                match WhisperRecognizer::new(config.recognition.clone()) {
                    Ok(engine) => {
                        state = state.with_dictation(DictationController::new(Box::new(engine)));
                    }
                    Err(e) => warn!("Dictation unavailable: {}", e),
                }
            }

            if config.enable_playback {
                match Self::build_player(&config) {
                    Ok(player) => state = state.with_player(player),
                    Err(e) => warn!("Speech playback unavailable: {}", e),
                }
            }

            match AudioOutput::new() {
                Ok(mut output) => {
                    let (tx, rx) = crossbeam_channel::unbounded();
                    if output.start_playback(rx).is_ok() {
                        let cues = MessageCues::load(&config.sounds_dir, output.sample_rate());
                        state = state.with_cues(cues, tx);
                        cue_output = Some(output);
                    }
                }
                Err(e) => warn!("Message cues unavailable: {}", e),
            }
        }

        Self {
            state,
            theme,
            peer_id,
            initialized: false,

            #[cfg(feature = "audio-io")]
            _cue_output: cue_output,
        }
    }

    #[cfg(feature = "audio-io")]
    fn build_player(config: &AppConfig) -> crate::Result<UtterancePlayer> {
        let sink = SpeakerSink::new()?;

        let synthesis = config
            .synthesis
            .clone()
            .with_sample_rate(sink.sample_rate());
        let catalog = synthesis.catalog();

        let pipeline = SynthesisPipeline::new(synthesis);
        let command_tx = pipeline.command_sender();
        let event_rx = pipeline.event_receiver();
        pipeline.start_worker()?;

        Ok(UtterancePlayer::new(&catalog, command_tx, event_rx).with_sink(Box::new(sink)))
    }

    /// First-frame setup: load the conversation and start listening for
    /// incoming messages.
    fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        let peer_id = self.peer_id.clone();
        self.state.chat.get_messages(&peer_id);
        self.state.chat.subscribe();
        self.initialized = true;
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        TopBottomPanel::top("header")
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_secondary)
                    .inner_margin(10.0),
            )
            .show(ctx, |ui| {
                ChatHeader::new(&mut self.state, &self.theme).show(ui);
            });
    }

    fn show_input_area(&mut self, ctx: &egui::Context) {
        TopBottomPanel::bottom("input_area")
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_primary)
                    .inner_margin(self.theme.spacing_sm),
            )
            .show(ctx, |ui| {
                if let Some(notice) = self.state.notice() {
                    let notice = notice.to_string();
                    egui::Frame::none()
                        .fill(self.theme.warning.gamma_multiply(0.2))
                        .rounding(self.theme.card_rounding)
                        .inner_margin(self.theme.spacing_sm)
                        .show(ui, |ui| {
                            ui.label(RichText::new(notice).size(12.0).color(self.theme.warning));
                        });
                    ui.add_space(self.theme.spacing_sm);
                }

                InputBar::new(&mut self.state, &self.theme).show(ui);
            });
    }

    fn show_content(&mut self, ctx: &egui::Context) {
        CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.bg_primary))
            .show(ctx, |ui| match self.state.panel {
                PanelView::Messages => {
                    MessageList::new(&mut self.state, &self.theme).show(ui);
                }
                PanelView::Todo => {
                    TodoPanel::new(&mut self.state, &self.theme).show(ui);
                }
            });
    }
}

impl eframe::App for ParleyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.initialize();

        self.state.poll_events();

        self.show_header(ctx);
        self.show_input_area(ctx);
        self.show_content(ctx);

        // Worker events (incoming messages, transcripts) arrive without
        // any input event, so keep a steady repaint cadence.
        ctx.request_repaint_after(Duration::from_millis(100));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.state.teardown();
    }
}
