use eframe::egui;

use crate::cli::Cli;
use crate::config::KatilConfig;
use crate::session::Session;
use crate::state::AppState;
use crate::ui::plot::SeriesCache;
use crate::ui::{console, dialogs, panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct KatilApp {
    pub state: AppState,
    series: SeriesCache,
    /// Last observed `[x, y, width, height]` of the window.
    geometry: Option<[f32; 4]>,
}

impl KatilApp {
    /// Restore the saved session, then open the files given on the command line.
    pub fn new(cc: &eframe::CreationContext<'_>, cli: &Cli, config: KatilConfig) -> Self {
        let mut state = AppState::new(config);
        match cc.storage {
            Some(storage) if !cli.fresh => state.restore_session(Session::load(storage)),
            _ => log::info!("Starting with an empty session"),
        }
        for path in &cli.files {
            state.open_path(path);
        }
        if state.config.notebook_autostart {
            state.start_notebook();
        }
        Self {
            state,
            series: SeriesCache::default(),
            geometry: None,
        }
    }
}

impl eframe::App for KatilApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Saved window placement ----
        if let Some([x, y, w, h]) = self.state.pending_geometry.take() {
            ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(egui::pos2(x, y)));
            ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(egui::vec2(w, h)));
        }
        self.geometry = ctx.input(|i| {
            let viewport = i.viewport();
            match (viewport.outer_rect, viewport.inner_rect) {
                (Some(outer), Some(inner)) => {
                    Some([outer.min.x, outer.min.y, inner.width(), inner.height()])
                }
                _ => None,
            }
        });

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Docks ----
        if self.state.window.show_files {
            egui::SidePanel::left("files_dock")
                .default_width(220.0)
                .resizable(true)
                .show(ctx, |ui| {
                    panels::files_panel(ui, &mut self.state);
                });
        }

        if self.state.window.show_console {
            egui::TopBottomPanel::bottom("console_dock")
                .default_height(200.0)
                .resizable(true)
                .show(ctx, |ui| {
                    console::console_panel(ui, &mut self.state);
                });
        }

        if self.state.window.show_resources {
            egui::SidePanel::right("resources_dock")
                .default_width(380.0)
                .resizable(true)
                .show(ctx, |ui| {
                    panels::resources_panel(ui, &mut self.state);
                });
        }

        // ---- Central panel: plot docks ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::dock_area(ui, &mut self.state, &mut self.series);
        });

        dialogs::show(ctx, &mut self.state);
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.state.capture_session(self.geometry).save(storage);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.state.stop_notebook();
    }
}
