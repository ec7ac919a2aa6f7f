//! To-do list panel
//!
//! Add field on top, then the task rows: completion toggle, text, and
//! delete. Tasks are addressed by position, so the row index is the
//! identity handed back to the store.

use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use egui::{self, Key, RichText};

pub struct TodoPanel<'a> {
    state: &'a mut AppState,
    theme: &'a Theme,
}

enum TaskAction {
    Toggle(usize),
    Delete(usize),
}

impl<'a> TodoPanel<'a> {
    pub fn new(state: &'a mut AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        ui.add_space(self.theme.spacing);

        ui.label(
            RichText::new("To-Do List")
                .size(18.0)
                .strong()
                .color(self.theme.text_primary),
        );

        ui.add_space(self.theme.spacing_sm);

        ui.horizontal(|ui| {
            let input = egui::TextEdit::singleline(&mut self.state.task_input)
                .hint_text("Add a new task")
                .desired_width(ui.available_width() - 48.0);
            let response = ui.add(input);

            let submitted =
                response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
            if ui.button("＋").on_hover_text("Add task").clicked() || submitted {
                self.state.add_task();
            }
        });

        ui.add_space(self.theme.spacing);

        let tasks = self.state.tasks.tasks();
        let mut action = None;

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (index, task) in tasks.iter().enumerate() {
                    ui.horizontal(|ui| {
                        let (icon, color) = if task.completed {
                            ("✔", self.theme.success)
                        } else {
                            ("○", self.theme.text_muted)
                        };
                        if ui
                            .small_button(RichText::new(icon).color(color))
                            .on_hover_text("Toggle completion")
                            .clicked()
                        {
                            action = Some(TaskAction::Toggle(index));
                        }

                        let text = if task.completed {
                            RichText::new(&task.text)
                                .strikethrough()
                                .color(self.theme.text_muted)
                        } else {
                            RichText::new(&task.text).color(self.theme.text_primary)
                        };
                        ui.label(text);

                        ui.with_layout(
                            egui::Layout::right_to_left(egui::Align::Center),
                            |ui| {
                                if ui
                                    .small_button("✕")
                                    .on_hover_text("Delete task")
                                    .clicked()
                                {
                                    action = Some(TaskAction::Delete(index));
                                }
                            },
                        );
                    });
                    ui.add_space(self.theme.spacing_sm / 2.0);
                }
            });

        match action {
            Some(TaskAction::Toggle(index)) => self.state.toggle_task(index),
            Some(TaskAction::Delete(index)) => self.state.delete_task(index),
            None => {}
        }
    }
}
