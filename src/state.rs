use std::path::{Path, PathBuf};

use crate::analysis::resource_features;
use crate::browser::FileBrowser;
use crate::config::KatilConfig;
use crate::console::{self, Console};
use crate::error::{ActionError, ResourceError};
use crate::notebook::NotebookServer;
use crate::resource::loader::FileType;
use crate::resource::ResourceRegistry;
use crate::session::{Session, WindowState};
use crate::view::series::{build_series, data_limits};
use crate::view::{PlotArgs, PlotDocks, PlotState, PlotType};

// ---------------------------------------------------------------------------
// Dialogs
// ---------------------------------------------------------------------------

/// The single modal dialog that may be open.
#[derive(Debug, Clone, PartialEq)]
pub enum Dialog {
    Features {
        source: String,
        window: f64,
        step: f64,
        alias: String,
    },
    Transform {
        source: String,
        alias: String,
        code: String,
    },
    Error {
        title: String,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: KatilConfig,

    /// Every open resource, by alias.
    pub registry: ResourceRegistry,

    /// Open plot views and their tab groups.
    pub docks: PlotDocks,

    pub console: Console,

    pub browser: FileBrowser,

    /// Dock visibility.
    pub window: WindowState,

    pub dialog: Option<Dialog>,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,

    pub notebook: Option<NotebookServer>,

    /// Saved window rect, applied on the first frame.
    pub pending_geometry: Option<[f32; 4]>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(KatilConfig::default())
    }
}

impl AppState {
    pub fn new(config: KatilConfig) -> Self {
        let console = Console::new(&config.console_banner);
        let browser = FileBrowser::new(config.resolved_browse_root());
        Self {
            config,
            registry: ResourceRegistry::new(),
            docks: PlotDocks::default(),
            console,
            browser,
            window: WindowState::default(),
            dialog: None,
            status_message: None,
            notebook: None,
            pending_geometry: None,
        }
    }

    // ---- resources ----

    /// Open a file as a resource; domain errors open the error dialog.
    pub fn open_path(&mut self, path: &Path) {
        match self.registry.open_file(path) {
            Ok(resource) => {
                self.status_message = Some(format!("Opened {}", resource.alias));
            }
            Err(e) => self.report_resource_error(e),
        }
    }

    pub fn open_file_dialog(&mut self) {
        let all = FileType::all_extensions();
        let mut dialog = rfd::FileDialog::new()
            .set_title("Open resource")
            .set_directory(self.browser.root())
            .add_filter("Supported files", &all[..]);
        for t in FileType::ALL {
            dialog = dialog.add_filter(t.label(), t.extensions());
        }
        if let Some(paths) = dialog.pick_files() {
            for path in paths {
                self.open_path(&path);
            }
        }
    }

    pub fn open_folder_dialog(&mut self) {
        if let Some(dir) = rfd::FileDialog::new()
            .set_title("Browse folder")
            .set_directory(self.browser.root())
            .pick_folder()
        {
            self.set_browse_root(dir);
        }
    }

    pub fn set_browse_root(&mut self, dir: PathBuf) {
        log::info!("Browsing {}", dir.display());
        self.browser.set_root(dir.clone());
        self.window.browse_root = Some(dir);
    }

    pub fn delete_resource(&mut self, alias: &str) {
        match self.registry.remove(alias) {
            Ok(r) => self.status_message = Some(format!("Deleted {}", r.alias)),
            Err(e) => self.report_resource_error(e),
        }
    }

    fn report_resource_error(&mut self, e: ResourceError) {
        log::error!("{e}");
        if e.is_user_facing() {
            self.dialog = Some(Dialog::Error {
                title: e.title().to_string(),
                message: e.to_string(),
            });
        } else {
            self.status_message = Some(format!("Error: {e}"));
        }
    }

    fn report_action_error(&mut self, title: &str, e: ActionError) {
        log::error!("{title}: {e}");
        self.dialog = Some(Dialog::Error {
            title: title.to_string(),
            message: e.to_string(),
        });
    }

    // ---- actions ----

    /// Open the feature dialog for a resource.
    pub fn request_features(&mut self, source: &str) {
        self.dialog = Some(Dialog::Features {
            source: source.to_string(),
            window: self.config.feature_window,
            step: self.config.feature_step,
            alias: "STF".to_string(),
        });
    }

    /// Open the transform dialog for a resource.
    pub fn request_transform(&mut self, source: &str) {
        self.dialog = Some(Dialog::Transform {
            source: source.to_string(),
            alias: format!("{source}_transformed"),
            code: format!("{} + 1", console::DATA_VAR),
        });
    }

    /// Extract short-term features; returns the stored alias.
    pub fn run_features(&mut self, source: &str, window: f64, step: f64, alias: &str) -> Option<String> {
        let result = match self.registry.get(source) {
            Some(r) => resource_features(r, window, step),
            None => Err(ResourceError::UnknownResource(source.to_string()).into()),
        };
        match result {
            Ok(array) => {
                let stored = self.registry.add_array(alias, array);
                self.status_message = Some(format!("Short term features stored as {stored}"));
                Some(stored)
            }
            Err(e) => {
                self.report_action_error("Short term features", e);
                None
            }
        }
    }

    /// Apply console code to a resource; returns the stored alias.
    pub fn run_transform(&mut self, source: &str, alias: &str, code: &str) -> Option<String> {
        let result: Result<_, ActionError> = match self.registry.get(source) {
            Some(r) => console::transform(r, code, &self.registry).map_err(Into::into),
            None => Err(ResourceError::UnknownResource(source.to_string()).into()),
        };
        match result {
            Ok(array) => {
                let stored = self.registry.add_array(alias, array);
                self.console
                    .print(console::LineKind::Output, format!("transform of '{source}' stored as '{stored}'"));
                self.status_message = Some(format!("Transform stored as {stored}"));
                Some(stored)
            }
            Err(e) => {
                self.report_action_error("Arbitrary transform", e);
                None
            }
        }
    }

    // ---- plots ----

    /// Open a plot dock for a resource in `group` (a new group if `None`).
    pub fn plot_resource(&mut self, alias: &str, plot_type: PlotType, group: Option<&str>) {
        let Some(resource) = self.registry.get(alias) else {
            self.report_resource_error(ResourceError::UnknownResource(alias.to_string()));
            return;
        };
        let args = PlotArgs::all(alias);
        let set = build_series(resource, &args, self.config.max_plot_points);
        let (xlim, ylim) = data_limits(&set);
        let state = PlotState::new(args, plot_type, xlim, ylim);
        let group = match group {
            Some(g) => g.to_string(),
            None => self.docks.new_group_name(),
        };
        self.docks.add(&group, state);
    }

    // ---- notebook server ----

    pub fn start_notebook(&mut self) {
        if self.notebook.as_mut().is_some_and(|n| n.is_running()) {
            return;
        }
        match NotebookServer::spawn(&self.config.notebook_command, self.browser.root()) {
            Ok(server) => {
                self.status_message = Some(format!(
                    "Notebook server '{}' running (pid {})",
                    server.command(),
                    server.pid()
                ));
                self.notebook = Some(server);
            }
            Err(e) => {
                log::error!("Notebook server: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    pub fn stop_notebook(&mut self) {
        if let Some(mut server) = self.notebook.take() {
            server.stop();
            self.status_message = Some("Notebook server stopped".to_string());
        }
    }

    pub fn notebook_running(&mut self) -> bool {
        self.notebook.as_mut().is_some_and(|n| n.is_running())
    }

    // ---- session ----

    pub fn capture_session(&self, geometry: Option<[f32; 4]>) -> Session {
        Session {
            geometry,
            window_state: self.window.clone(),
            resources: self.registry.records(),
            plots: self.docks.snapshot(),
        }
    }

    pub fn restore_session(&mut self, session: Session) {
        self.window = session.window_state;
        if let Some(root) = self.window.browse_root.clone() {
            self.browser.set_root(root);
        }
        let restored = self.registry.restore(session.resources);
        self.docks.restore(session.plots);
        self.pending_geometry = session.geometry;
        log::info!(
            "Restored session: {restored} resources, {} plots",
            self.docks.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NumericArray;

    fn state_with_signal() -> AppState {
        let mut state = AppState::default();
        let signal: Vec<f64> = (0..4000).map(|i| (i as f64 * 0.2).sin()).collect();
        state
            .registry
            .add_array("sig", NumericArray::column(signal).with_sample_rate(Some(8000.0)));
        state
    }

    #[test]
    fn duplicate_open_shows_dialog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "a\n1\n").unwrap();
        let mut state = AppState::default();
        state.open_path(&path);
        assert!(state.dialog.is_none());
        state.open_path(&path);
        assert!(matches!(
            state.dialog,
            Some(Dialog::Error { ref title, .. }) if title == "Duplicate resource"
        ));
    }

    #[test]
    fn features_and_transform_add_resources() {
        let mut state = state_with_signal();
        assert_eq!(state.run_features("sig", 0.05, 0.025, "STF").as_deref(), Some("STF"));
        assert_eq!(state.run_features("sig", 0.05, 0.025, "STF").as_deref(), Some("STF_1"));
        assert_eq!(state.registry.get("STF").unwrap().to_array().cols, 34);

        state.request_transform("sig");
        let Some(Dialog::Transform { alias, code, .. }) = state.dialog.clone() else {
            panic!("expected transform dialog");
        };
        assert_eq!(alias, "sig_transformed");
        let stored = state.run_transform("sig", &alias, &code).unwrap();
        assert_eq!(state.registry.get(&stored).unwrap().sample_rate(), Some(8000.0));

        assert!(state.run_features("sig", -1.0, 0.05, "bad").is_none());
        assert!(matches!(state.dialog, Some(Dialog::Error { .. })));
    }

    #[test]
    fn plots_roundtrip_through_session() {
        let mut state = state_with_signal();
        state.plot_resource("sig", PlotType::Line, None);
        state.plot_resource("sig", PlotType::Scatter, Some("plots"));
        state.plot_resource("sig", PlotType::Line, None);
        assert_eq!(state.docks.groups(), vec!["plots", "plots 2"]);

        let session = state.capture_session(Some([0.0, 0.0, 800.0, 600.0]));
        let mut fresh = AppState::default();
        fresh.restore_session(session.clone());
        assert_eq!(fresh.docks.snapshot(), session.plots);
        assert_eq!(fresh.registry.aliases(), vec!["sig"]);
        assert_eq!(fresh.pending_geometry, Some([0.0, 0.0, 800.0, 600.0]));
    }
}
