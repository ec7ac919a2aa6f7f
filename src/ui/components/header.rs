//! Conversation header
//!
//! Normal mode shows the peer and their presence; search mode swaps the
//! left side for a live search field. The task-panel and search toggles
//! live on the right in both modes.

use crate::ui::state::{AppState, HeaderMode, PanelView};
use crate::ui::theme::Theme;
use egui::{self, RichText};

pub struct ChatHeader<'a> {
    state: &'a mut AppState,
    theme: &'a Theme,
}

impl<'a> ChatHeader<'a> {
    pub fn new(state: &'a mut AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            match self.state.header {
                HeaderMode::Search => {
                    let search = egui::TextEdit::singleline(&mut self.state.search_term)
                        .hint_text("Search messages...")
                        .desired_width(ui.available_width() - 100.0);
                    let response = ui.add(search);
                    if self.state.take_search_focus() {
                        response.request_focus();
                    }
                }
                HeaderMode::Normal => {
                    ui.label(
                        RichText::new(&self.state.peer.name)
                            .size(16.0)
                            .strong()
                            .color(self.theme.text_primary),
                    );

                    let online = self.state.auth.is_online(&self.state.peer.id);
                    let (presence, color) = if online {
                        ("Online", self.theme.success)
                    } else {
                        ("Offline", self.theme.text_muted)
                    };
                    ui.label(RichText::new(presence).size(12.0).color(color));
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                // Search toggle
                if ui.button("🔍").on_hover_text("Search messages").clicked() {
                    self.state.toggle_search();
                }

                // To-do panel toggle
                let todo_active = self.state.panel == PanelView::Todo;
                let todo_icon = if todo_active { "💬" } else { "☑" };
                let todo_hint = if todo_active {
                    "Back to messages"
                } else {
                    "Show to-do list"
                };
                if ui.button(todo_icon).on_hover_text(todo_hint).clicked() {
                    self.state.toggle_panel();
                }
            });
        });
    }
}
