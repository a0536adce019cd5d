use std::path::{Path, PathBuf};

use eframe::egui::{self, Color32, RichText, ScrollArea, Sense, Ui};
use egui_extras::{Column, TableBuilder};

use crate::browser::FileBrowser;
use crate::state::AppState;
use crate::view::PlotType;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                ui.close_menu();
                state.open_file_dialog();
            }
            if ui.button("Open folder…").clicked() {
                ui.close_menu();
                state.open_folder_dialog();
            }
            ui.separator();
            if ui.button("Quit").clicked() {
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ui.menu_button("View", |ui: &mut Ui| {
            ui.checkbox(&mut state.window.show_files, "Files");
            ui.checkbox(&mut state.window.show_resources, "Resources");
            ui.checkbox(&mut state.window.show_console, "Console");
            ui.separator();
            if ui.button("Reset plot layout").clicked() {
                state.docks.reset_layout();
                ui.close_menu();
            }
        });

        ui.menu_button("Tools", |ui: &mut Ui| {
            if state.notebook_running() {
                if ui.button("Stop notebook server").clicked() {
                    state.stop_notebook();
                    ui.close_menu();
                }
            } else if ui.button("Start notebook server").clicked() {
                state.start_notebook();
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(format!(
            "{} resources, {} plots",
            state.registry.len(),
            state.docks.len()
        ));

        if let Some(msg) = &state.status_message {
            ui.separator();
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                ui.visuals().weak_text_color()
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File browser dock
// ---------------------------------------------------------------------------

/// Render the file browser; double-clicking a file opens it.
pub fn files_panel(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.heading("Files");
        if ui.small_button("⟳").on_hover_text("Refresh").clicked() {
            state.browser.refresh();
        }
        if ui.small_button("⬆").on_hover_text("Parent folder").clicked() {
            if let Some(parent) = state.browser.root().parent().map(Path::to_path_buf) {
                state.set_browse_root(parent);
            }
        }
    });
    ui.label(RichText::new(state.browser.root().display().to_string()).small().weak());
    ui.separator();

    let mut to_open: Option<PathBuf> = None;
    let root = state.browser.root().to_path_buf();
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            directory_tree(ui, &mut state.browser, &root, &mut to_open);
        });

    if let Some(path) = to_open {
        state.open_path(&path);
    }
}

fn directory_tree(ui: &mut Ui, browser: &mut FileBrowser, dir: &Path, to_open: &mut Option<PathBuf>) {
    let entries = browser.entries(dir).to_vec();
    if entries.is_empty() {
        ui.label(RichText::new("(empty)").weak());
    }
    for entry in entries {
        if entry.is_dir {
            egui::CollapsingHeader::new(format!("📁 {}", entry.name))
                .id_salt(&entry.path)
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    directory_tree(ui, browser, &entry.path, to_open);
                });
        } else {
            let selected = browser.selected.as_deref() == Some(entry.path.as_path());
            let response = ui.selectable_label(selected, &entry.name);
            if response.clicked() {
                browser.selected = Some(entry.path.clone());
            }
            if response.double_clicked() {
                *to_open = Some(entry.path.clone());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Resource dock
// ---------------------------------------------------------------------------

/// Something the user picked from a resource's context menu.
#[derive(Debug, Clone, PartialEq)]
enum ResourceAction {
    Plot {
        alias: String,
        plot_type: PlotType,
        group: Option<String>,
    },
    Features(String),
    Transform(String),
    Delete(String),
}

struct ResourceRow {
    alias: String,
    type_name: &'static str,
    path: String,
    value: String,
    numeric: bool,
}

/// Render the resource table with its context menus.
pub fn resources_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Resources");
    ui.separator();

    if state.registry.is_empty() {
        ui.label("No resources open. Double-click a file or use File → Open…");
        return;
    }

    let rows: Vec<ResourceRow> = state
        .registry
        .iter()
        .map(|r| ResourceRow {
            alias: r.alias.clone(),
            type_name: r.type_name(),
            path: r.path().map(|p| p.display().to_string()).unwrap_or_default(),
            value: r.summary(),
            numeric: r.has_signal(),
        })
        .collect();
    let groups = state.docks.groups();
    let mut action: Option<ResourceAction> = None;

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .column(Column::auto().at_least(80.0))
        .column(Column::auto())
        .column(Column::initial(180.0).clip(true))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            for title in ["Alias", "Type", "Path", "Value"] {
                header.col(|ui: &mut Ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for row in &rows {
                body.row(18.0, |mut table_row| {
                    table_row.col(|ui: &mut Ui| {
                        let response = ui
                            .add(egui::Label::new(RichText::new(&row.alias).strong()).sense(Sense::click()))
                            .on_hover_text("Right-click for actions");
                        if response.double_clicked() {
                            action = Some(ResourceAction::Plot {
                                alias: row.alias.clone(),
                                plot_type: PlotType::Line,
                                group: None,
                            });
                        }
                        response.context_menu(|ui: &mut Ui| {
                            if let Some(a) = resource_menu(ui, row, &groups) {
                                action = Some(a);
                                ui.close_menu();
                            }
                        });
                    });
                    table_row.col(|ui: &mut Ui| {
                        ui.label(row.type_name);
                    });
                    table_row.col(|ui: &mut Ui| {
                        ui.label(&row.path).on_hover_text(&row.path);
                    });
                    table_row.col(|ui: &mut Ui| {
                        ui.label(&row.value);
                    });
                });
            }
        });

    match action {
        Some(ResourceAction::Plot {
            alias,
            plot_type,
            group,
        }) => state.plot_resource(&alias, plot_type, group.as_deref()),
        Some(ResourceAction::Features(alias)) => state.request_features(&alias),
        Some(ResourceAction::Transform(alias)) => state.request_transform(&alias),
        Some(ResourceAction::Delete(alias)) => state.delete_resource(&alias),
        None => {}
    }
}

fn resource_menu(ui: &mut Ui, row: &ResourceRow, groups: &[String]) -> Option<ResourceAction> {
    let mut action = None;
    ui.menu_button("Plot", |ui: &mut Ui| {
        for plot_type in PlotType::ALL {
            ui.menu_button(plot_type.label(), |ui: &mut Ui| {
                if ui.button("New tab group").clicked() {
                    action = Some(ResourceAction::Plot {
                        alias: row.alias.clone(),
                        plot_type: *plot_type,
                        group: None,
                    });
                }
                if !groups.is_empty() {
                    ui.separator();
                }
                for group in groups {
                    if ui.button(format!("In '{group}'")).clicked() {
                        action = Some(ResourceAction::Plot {
                            alias: row.alias.clone(),
                            plot_type: *plot_type,
                            group: Some(group.clone()),
                        });
                    }
                }
            });
        }
    });
    if row.numeric && ui.button("Short term features…").clicked() {
        action = Some(ResourceAction::Features(row.alias.clone()));
    }
    if ui.button("Arbitrary transform…").clicked() {
        action = Some(ResourceAction::Transform(row.alias.clone()));
    }
    ui.separator();
    if ui.button("Delete").clicked() {
        action = Some(ResourceAction::Delete(row.alias.clone()));
    }
    action
}
