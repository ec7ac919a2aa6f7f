//! Message list
//!
//! Bubbles aligned by sender, with per-message speak and copy actions.
//! The list renders whatever passes the live search filter and sticks
//! to the newest message.

use crate::chat::Message;
use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use egui::{self, Align, Color32, RichText};

pub struct MessageList<'a> {
    state: &'a mut AppState,
    theme: &'a Theme,
}

impl<'a> MessageList<'a> {
    pub fn new(state: &'a mut AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        if self.state.chat.is_loading() {
            self.show_loading_skeleton(ui);
            return;
        }

        let messages = self.state.filtered_messages();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.add_space(self.theme.spacing);

                    if messages.is_empty() {
                        self.show_empty_state(ui);
                    } else {
                        for message in &messages {
                            self.show_message(ui, message);
                            ui.add_space(self.theme.spacing_sm);
                        }
                    }

                    ui.add_space(self.theme.spacing);
                });
            });
    }

    fn show_loading_skeleton(&self, ui: &mut egui::Ui) {
        ui.add_space(self.theme.spacing);
        for i in 0..4 {
            let align = if i % 2 == 0 { Align::LEFT } else { Align::RIGHT };
            ui.with_layout(egui::Layout::top_down(align), |ui| {
                egui::Frame::none()
                    .fill(self.theme.bg_secondary)
                    .rounding(self.theme.bubble_rounding)
                    .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                    .show(ui, |ui| {
                        ui.add_sized(
                            [ui.available_width() * 0.4, 18.0],
                            egui::Label::new(""),
                        );
                    });
            });
            ui.add_space(self.theme.spacing_sm);
        }
    }

    fn show_empty_state(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(80.0);

            ui.label(
                RichText::new("No messages yet")
                    .size(20.0)
                    .color(self.theme.text_primary),
            );

            ui.add_space(self.theme.spacing_sm);

            ui.label(
                RichText::new("Say hello by typing below or using the microphone.")
                    .size(13.0)
                    .color(self.theme.text_muted),
            );
        });
    }

    fn show_message(&mut self, ui: &mut egui::Ui, message: &Message) {
        let is_user = message.sender_id == self.state.auth.user_id;

        let bubble_color = if is_user {
            self.theme.user_bubble
        } else {
            self.theme.peer_bubble
        };
        let text_color = if is_user {
            Color32::WHITE
        } else {
            self.theme.text_primary
        };
        let align = if is_user { Align::RIGHT } else { Align::LEFT };

        ui.with_layout(egui::Layout::top_down(align), |ui| {
            let sender_label = if is_user {
                "You"
            } else {
                self.state.peer.name.as_str()
            };
            ui.label(
                RichText::new(sender_label)
                    .size(11.0)
                    .color(self.theme.text_muted),
            );

            ui.add_space(2.0);

            let max_width = ui.available_width() * 0.75;

            egui::Frame::none()
                .fill(bubble_color)
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    ui.set_max_width(max_width);

                    if message.image.is_some() {
                        ui.horizontal(|ui| {
                            ui.label(RichText::new("🖼").size(22.0));
                            ui.label(RichText::new("Image").color(text_color));
                        });
                    }

                    if let Some(text) = &message.text {
                        ui.label(RichText::new(text).color(text_color));
                        ui.add_space(2.0);
                        self.show_message_actions(ui, message, text);
                    }
                });

            ui.label(
                RichText::new(message.time_label())
                    .size(10.0)
                    .color(self.theme.text_muted),
            );
        });
    }

    fn show_message_actions(&mut self, ui: &mut egui::Ui, message: &Message, text: &str) {
        ui.horizontal(|ui| {
            // Speak / stop toggle
            if self.state.player.is_some() {
                let playing = self.state.playing_text() == Some(text);
                let (icon, hint) = if playing {
                    ("🔇", "Stop reading")
                } else {
                    ("🔊", "Read aloud")
                };
                if ui.small_button(icon).on_hover_text(hint).clicked() {
                    self.state.toggle_playback(text);
                }
            }

            // Copy with a timed confirmation
            let copied = self.state.is_copied(message.id);
            let (icon, hint) = if copied {
                ("✔", "Copied")
            } else {
                ("📋", "Copy text")
            };
            if ui.small_button(icon).on_hover_text(hint).clicked() {
                self.state.copy_message(message.id, text);
            }
        });
    }
}
