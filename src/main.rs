mod analysis;
mod app;
mod browser;
mod cli;
mod color;
mod config;
mod console;
mod error;
mod notebook;
mod resource;
mod session;
mod state;
mod ui;
mod view;

use app::KatilApp;
use clap::Parser;
use cli::Cli;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e:#}");
            std::process::exit(2);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        // Window placement is part of the session store.
        persist_window: false,
        ..Default::default()
    };

    eframe::run_native(
        "Katil",
        options,
        Box::new(move |cc| Ok(Box::new(KatilApp::new(cc, &cli, config)))),
    )
}
