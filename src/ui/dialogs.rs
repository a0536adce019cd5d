use eframe::egui::{self, Align2, Color32, DragValue, RichText, TextEdit, Ui};

use crate::state::{AppState, Dialog};

/// What the user did with the open dialog this frame.
enum Outcome {
    Open,
    Cancel,
    Accept,
}

// ---------------------------------------------------------------------------
// Modal dialogs
// ---------------------------------------------------------------------------

/// Render the open dialog, if any, and run its action when accepted.
pub fn show(ctx: &egui::Context, state: &mut AppState) {
    let Some(mut dialog) = state.dialog.take() else {
        return;
    };

    let outcome = match &mut dialog {
        Dialog::Features {
            source,
            window,
            step,
            alias,
        } => dialog_window(ctx, "Short term features", |ui: &mut Ui| {
            ui.label(format!("Source: {source}"));
            egui::Grid::new("features_form").num_columns(2).show(ui, |ui: &mut Ui| {
                ui.label("Window [s]");
                ui.add(DragValue::new(window).speed(0.001).range(0.001..=10.0));
                ui.end_row();
                ui.label("Step [s]");
                ui.add(DragValue::new(step).speed(0.001).range(0.001..=10.0));
                ui.end_row();
                ui.label("Alias");
                ui.text_edit_singleline(alias);
                ui.end_row();
            });
        }),
        Dialog::Transform {
            source,
            alias,
            code,
        } => dialog_window(ctx, "Arbitrary transform", |ui: &mut Ui| {
            ui.label(format!(
                "Source: {source}  (bound as {})",
                crate::console::DATA_VAR
            ));
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Alias");
                ui.text_edit_singleline(alias);
            });
            ui.add(
                TextEdit::multiline(code)
                    .code_editor()
                    .desired_rows(4)
                    .desired_width(f32::INFINITY),
            );
        }),
        Dialog::Error { title, message } => {
            let mut outcome = Outcome::Open;
            egui::Window::new(RichText::new(title.as_str()).color(Color32::LIGHT_RED))
                .id(egui::Id::new("error_dialog"))
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui: &mut Ui| {
                    ui.label(message.as_str());
                    ui.add_space(8.0);
                    if ui.button("OK").clicked() {
                        outcome = Outcome::Cancel;
                    }
                });
            outcome
        }
    };

    match outcome {
        Outcome::Open => state.dialog = Some(dialog),
        Outcome::Cancel => {}
        Outcome::Accept => match dialog {
            Dialog::Features {
                source,
                window,
                step,
                alias,
            } => {
                state.run_features(&source, window, step, &alias);
            }
            Dialog::Transform { source, alias, code } => {
                state.run_transform(&source, &alias, &code);
            }
            Dialog::Error { .. } => {}
        },
    }
}

/// A centred window with the form and OK / Cancel buttons.
fn dialog_window(ctx: &egui::Context, title: &str, form: impl FnOnce(&mut Ui)) -> Outcome {
    let mut outcome = Outcome::Open;
    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui: &mut Ui| {
            form(ui);
            ui.add_space(8.0);
            ui.horizontal(|ui: &mut Ui| {
                if ui.button("OK").clicked() {
                    outcome = Outcome::Accept;
                }
                if ui.button("Cancel").clicked() {
                    outcome = Outcome::Cancel;
                }
            });
        });
    outcome
}
