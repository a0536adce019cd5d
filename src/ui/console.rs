use eframe::egui::{self, Color32, Key, RichText, ScrollArea, TextEdit, Ui};

use crate::console::LineKind;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Console dock
// ---------------------------------------------------------------------------

/// Render the console: scrollback above, input line below.
pub fn console_panel(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.heading("Console");
        if ui.small_button("Clear").clicked() {
            state.console.clear();
        }
    });
    ui.separator();

    let input_height = ui.spacing().interact_size.y + ui.spacing().item_spacing.y * 2.0;
    let scroll_height = (ui.available_height() - input_height).max(0.0);
    ScrollArea::vertical()
        .max_height(scroll_height)
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui: &mut Ui| {
            for line in &state.console.lines {
                let text = RichText::new(&line.text).monospace();
                let text = match line.kind {
                    LineKind::Input => text.color(ui.visuals().strong_text_color()),
                    LineKind::Output => text,
                    LineKind::Error => text.color(Color32::LIGHT_RED),
                };
                ui.label(text);
            }
        });

    ui.horizontal(|ui: &mut Ui| {
        ui.label(RichText::new(">>>").monospace());
        let response = ui.add(
            TextEdit::singleline(&mut state.console.input)
                .id_salt("console_input")
                .font(egui::TextStyle::Monospace)
                .hint_text("help")
                .desired_width(f32::INFINITY),
        );

        if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
            state.console.submit(&mut state.registry);
            response.request_focus();
        } else if response.has_focus() {
            if ui.input(|i| i.key_pressed(Key::ArrowUp)) {
                state.console.history_prev();
            } else if ui.input(|i| i.key_pressed(Key::ArrowDown)) {
                state.console.history_next();
            }
        }
    });
}
