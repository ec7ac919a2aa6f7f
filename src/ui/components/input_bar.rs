//! Message input bar
//!
//! Attachment picker, text input, microphone toggle, and send control.
//! A pending image shows as a preview row above the input with its own
//! remove button.

use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use egui::{self, Key, RichText, Vec2};

const IMAGE_FILTER: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

pub struct InputBar<'a> {
    state: &'a mut AppState,
    theme: &'a Theme,
}

impl<'a> InputBar<'a> {
    pub fn new(state: &'a mut AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        egui::Frame::none()
            .fill(self.theme.bg_secondary)
            .rounding(self.theme.card_rounding)
            .inner_margin(self.theme.spacing_sm)
            .show(ui, |ui| {
                if self.state.composer.image().is_some() {
                    self.show_attachment_preview(ui);
                    ui.add_space(self.theme.spacing_sm);
                }

                ui.horizontal(|ui| {
                    self.show_attach_button(ui);
                    ui.add_space(self.theme.spacing_sm);
                    self.show_text_input(ui);
                    ui.add_space(self.theme.spacing_sm);
                    self.show_mic_button(ui);
                    self.show_send_button(ui);
                });
            });
    }

    fn show_attachment_preview(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            egui::Frame::none()
                .fill(self.theme.bg_tertiary)
                .rounding(self.theme.card_rounding)
                .inner_margin(self.theme.spacing_sm)
                .show(ui, |ui| {
                    ui.label(RichText::new("🖼").size(20.0));
                    ui.label(
                        RichText::new("Image attached")
                            .size(12.0)
                            .color(self.theme.text_secondary),
                    );
                });

            if ui
                .small_button("✕")
                .on_hover_text("Remove image")
                .clicked()
            {
                self.state.composer.remove_image();
            }
        });
    }

    fn show_attach_button(&mut self, ui: &mut egui::Ui) {
        let has_image = self.state.composer.image().is_some();
        let color = if has_image {
            self.theme.primary
        } else {
            self.theme.text_muted
        };

        let button = egui::Button::new(RichText::new("🖼").size(18.0).color(color))
            .min_size(Vec2::splat(36.0))
            .rounding(self.theme.button_rounding);

        if ui.add(button).on_hover_text("Attach an image").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("Images", IMAGE_FILTER)
                .pick_file()
            {
                self.state.attach_image_file(path);
            }
        }
    }

    fn show_text_input(&mut self, ui: &mut egui::Ui) {
        // Reserve space for the mic and send buttons
        let available_width = ui.available_width() - 96.0;

        let text_edit = egui::TextEdit::singleline(self.state.composer.text_mut())
            .hint_text("Type a message...")
            .desired_width(available_width)
            .font(egui::TextStyle::Body)
            .margin(egui::Margin::symmetric(12.0, 8.0));

        let response = ui.add(text_edit);

        if response.has_focus() {
            let enter_pressed = ui.input(|i| i.key_pressed(Key::Enter));
            let shift_held = ui.input(|i| i.modifiers.shift);
            if enter_pressed && !shift_held {
                self.state.submit();
            }
        }
    }

    fn show_mic_button(&mut self, ui: &mut egui::Ui) {
        if self.state.dictation.is_none() {
            return;
        }

        let listening = self.state.is_listening();
        let (icon, tooltip, color) = if listening {
            ("🔇", "Stop dictation", self.theme.recording)
        } else {
            ("🎤", "Start dictation", self.theme.text_secondary)
        };

        let button = egui::Button::new(RichText::new(icon).size(18.0).color(color))
            .min_size(Vec2::splat(36.0))
            .rounding(self.theme.button_rounding);
        let button = if listening {
            button.fill(self.theme.recording.gamma_multiply(0.2))
        } else {
            button
        };

        let response = ui.add(button);
        let button_rect = response.rect;

        if response.on_hover_text(tooltip).clicked() {
            self.state.toggle_dictation();
        }

        // Pulsing ring while the microphone is live
        if listening {
            let t = ui.ctx().input(|i| i.time);
            let pulse = ((t * 3.0).sin() * 0.5 + 0.5) as f32;

            let painter = ui.painter();
            let center = button_rect.center();
            let radius = button_rect.width() / 2.0 + 2.0 + pulse * 3.0;

            painter.circle_stroke(
                center,
                radius,
                egui::Stroke::new(
                    2.0 * pulse,
                    self.theme.recording.gamma_multiply(1.0 - pulse * 0.5),
                ),
            );

            ui.ctx().request_repaint();
        }
    }

    fn show_send_button(&mut self, ui: &mut egui::Ui) {
        let can_send = self.state.composer.has_content();

        let fill = if can_send {
            self.theme.primary
        } else {
            self.theme.text_muted
        };

        let button = egui::Button::new(
            RichText::new("➤").size(16.0).color(egui::Color32::WHITE),
        )
        .min_size(Vec2::splat(36.0))
        .rounding(self.theme.button_rounding)
        .fill(fill);

        let response = ui.add_enabled(can_send, button);
        if response.on_hover_text("Send message (Enter)").clicked() {
            self.state.submit();
        }
    }
}
