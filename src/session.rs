use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::resource::ResourceRecord;
use crate::view::PlotState;

// ---------------------------------------------------------------------------
// Session store keys
// ---------------------------------------------------------------------------

pub const KEY_GEOMETRY: &str = "geometry";
pub const KEY_WINDOW_STATE: &str = "window_state";
pub const KEY_RESOURCES: &str = "resources";
pub const KEY_PLOTS: &str = "plots";

/// Which docks are shown, and where the file browser points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowState {
    pub show_files: bool,
    pub show_resources: bool,
    pub show_console: bool,
    pub browse_root: Option<PathBuf>,
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            show_files: true,
            show_resources: true,
            show_console: true,
            browse_root: None,
        }
    }
}

/// Everything persisted between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Outer window position and inner size, `[x, y, width, height]`.
    pub geometry: Option<[f32; 4]>,
    pub window_state: WindowState,
    pub resources: Vec<ResourceRecord>,
    /// `(tab_group, plot state)` per plot dock.
    pub plots: Vec<(String, PlotState)>,
}

impl Session {
    /// Write every key as JSON.
    pub fn save(&self, storage: &mut dyn eframe::Storage) {
        put(storage, KEY_GEOMETRY, &self.geometry);
        put(storage, KEY_WINDOW_STATE, &self.window_state);
        put(storage, KEY_RESOURCES, &self.resources);
        put(storage, KEY_PLOTS, &self.plots);
        log::debug!(
            "Saved session: {} resources, {} plots",
            self.resources.len(),
            self.plots.len()
        );
    }

    /// Read every key; missing or unreadable keys keep their defaults.
    pub fn load(storage: &dyn eframe::Storage) -> Self {
        Self {
            geometry: get::<Option<[f32; 4]>>(storage, KEY_GEOMETRY).flatten(),
            window_state: get(storage, KEY_WINDOW_STATE).unwrap_or_default(),
            resources: get_each(storage, KEY_RESOURCES),
            plots: get_each(storage, KEY_PLOTS),
        }
    }
}

fn put<T: Serialize>(storage: &mut dyn eframe::Storage, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => storage.set_string(key, json),
        Err(e) => log::warn!("Failed to serialise '{key}': {e}"),
    }
}

fn get<T: DeserializeOwned>(storage: &dyn eframe::Storage, key: &str) -> Option<T> {
    let json = storage.get_string(key)?;
    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring saved '{key}': {e}");
            None
        }
    }
}

/// Decode a list key entry by entry, so one unreadable entry does not
/// discard the others.
fn get_each<T: DeserializeOwned>(storage: &dyn eframe::Storage, key: &str) -> Vec<T> {
    let Some(entries) = get::<Vec<serde_json::Value>>(storage, key) else {
        return Vec::new();
    };
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match serde_json::from_value(entry) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Ignoring saved '{key}' entry {i}: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NumericArray;
    use crate::view::{PlotArgs, PlotType};
    use eframe::Storage as _;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStorage(HashMap<String, String>);

    impl eframe::Storage for MemoryStorage {
        fn get_string(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }

        fn set_string(&mut self, key: &str, value: String) {
            self.0.insert(key.to_string(), value);
        }

        fn flush(&mut self) {}
    }

    fn sample_session() -> Session {
        let mut zoomed = PlotState::new(
            PlotArgs {
                resource: "STF".into(),
                columns: vec![1, 2],
                x_column: None,
            },
            PlotType::Line,
            [0.0, 3.25],
            [-0.5, 0.75],
        );
        zoomed.update_canvas(|c| {
            c.zoom(8.0, 2.0);
            c.pan(0.5, -0.125);
        });
        Session {
            geometry: Some([10.0, 20.0, 1200.0, 800.0]),
            window_state: WindowState {
                show_console: false,
                ..WindowState::default()
            },
            resources: vec![
                ResourceRecord::Wav {
                    alias: "rec".into(),
                    path: PathBuf::from("/data/rec.wav"),
                },
                ResourceRecord::Array {
                    alias: "STF".into(),
                    data: NumericArray::column(vec![0.25, 0.5]).with_sample_rate(Some(20.0)),
                },
            ],
            plots: vec![
                ("plots".into(), zoomed),
                (
                    "plots 2".into(),
                    PlotState::new(PlotArgs::all("rec"), PlotType::Scatter, [0.0, 1.0], [-1.0, 1.0]),
                ),
            ],
        }
    }

    #[test]
    fn session_roundtrips_through_storage() {
        let session = sample_session();
        let mut storage = MemoryStorage::default();
        session.save(&mut storage);
        assert!(storage.0.contains_key(KEY_PLOTS));
        assert_eq!(Session::load(&storage), session);
    }

    #[test]
    fn bad_entries_are_skipped_one_by_one() {
        let session = sample_session();
        let mut storage = MemoryStorage::default();
        session.save(&mut storage);

        let mut plots: Vec<serde_json::Value> =
            serde_json::from_str(&storage.get_string(KEY_PLOTS).unwrap()).unwrap();
        plots[1][1]["centre_shift"] = serde_json::json!([null, 0.0]);
        storage.set_string(KEY_PLOTS, serde_json::to_string(&plots).unwrap());

        let mut resources: Vec<serde_json::Value> =
            serde_json::from_str(&storage.get_string(KEY_RESOURCES).unwrap()).unwrap();
        resources.insert(0, serde_json::json!({"kind": "mystery", "alias": "x"}));
        storage.set_string(KEY_RESOURCES, serde_json::to_string(&resources).unwrap());

        let back = Session::load(&storage);
        assert_eq!(back.plots, session.plots[..1].to_vec());
        assert_eq!(back.resources, session.resources);
    }

    #[test]
    fn missing_and_corrupt_keys_fall_back() {
        let mut storage = MemoryStorage::default();
        storage.set_string(KEY_PLOTS, "[[1, 2".to_string());
        let session = Session::load(&storage);
        assert_eq!(session, Session::default());
        assert!(session.window_state.show_files);
    }
}
