use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::loader::{load_csv, load_wav, FileType};
use super::model::{CsvFile, NumericArray, Resource, ResourceKind, WavFile};
use crate::error::ResourceError;

// ---------------------------------------------------------------------------
// Persisted form
// ---------------------------------------------------------------------------

/// How a resource is written to the session store: files by path, derived
/// arrays inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceRecord {
    Csv { alias: String, path: PathBuf },
    Wav { alias: String, path: PathBuf },
    Array { alias: String, data: NumericArray },
}

// ---------------------------------------------------------------------------
// ResourceRegistry
// ---------------------------------------------------------------------------

/// All resources open in the session, in insertion order.
/// Aliases are unique.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: Vec<Resource>,
    /// Bumped on every insertion or removal.
    revision: u64,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn aliases(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.alias.clone()).collect()
    }

    pub fn get(&self, alias: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.alias == alias)
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.get(alias).is_some()
    }

    /// Whether a file resource with the same canonical path is open.
    pub fn contains_path(&self, path: &Path) -> bool {
        let wanted = canonical(path);
        self.resources
            .iter()
            .filter_map(Resource::path)
            .any(|p| canonical(p) == wanted)
    }

    /// `base` if it is free, otherwise `base_N` with the smallest free N ≥ 1.
    pub fn unique_alias(&self, base: &str) -> String {
        let base = base.trim();
        let base = if base.is_empty() { "resource" } else { base };
        if !self.contains_alias(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.contains_alias(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Open a file as a resource, aliased after its file stem.
    pub fn open_file(&mut self, path: &Path) -> Result<&Resource, ResourceError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("resource")
            .to_string();
        self.open_file_as(path, &stem)
    }

    /// Open a file as a resource under (a uniquified version of) `alias`.
    pub fn open_file_as(&mut self, path: &Path, alias: &str) -> Result<&Resource, ResourceError> {
        if !path.exists() {
            return Err(ResourceError::NotFound(path.to_path_buf()));
        }
        let path = canonical(path);
        if self.contains_path(&path) {
            return Err(ResourceError::DuplicateResource(path));
        }
        let file_type =
            FileType::from_path(&path).ok_or_else(|| ResourceError::UnknownFileType(path.clone()))?;

        let kind = match file_type {
            FileType::Wav => ResourceKind::Wav(WavFile {
                audio: load_wav(&path)?,
                path,
            }),
            FileType::Csv => ResourceKind::Csv(CsvFile {
                table: load_csv(&path)?,
                path,
            }),
        };
        let alias = self.unique_alias(alias);
        let resource = Resource::new(alias, kind);
        log::info!("Opened {resource}");
        Ok(self.push(resource))
    }

    /// Register a derived array; returns the alias it was stored under.
    pub fn add_array(&mut self, alias: &str, array: NumericArray) -> String {
        let alias = self.unique_alias(alias);
        let resource = Resource::new(alias.clone(), ResourceKind::Array(array));
        log::info!("Added {resource}");
        self.push(resource);
        alias
    }

    /// Explicit deletion.
    pub fn remove(&mut self, alias: &str) -> Result<Resource, ResourceError> {
        let idx = self
            .resources
            .iter()
            .position(|r| r.alias == alias)
            .ok_or_else(|| ResourceError::UnknownResource(alias.to_string()))?;
        let removed = self.resources.remove(idx);
        self.revision += 1;
        log::info!("Removed {removed}");
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.resources.clear();
        self.revision += 1;
    }

    /// Serialisable form of every open resource.
    pub fn records(&self) -> Vec<ResourceRecord> {
        self.resources
            .iter()
            .map(|r| match &r.kind {
                ResourceKind::Csv(f) => ResourceRecord::Csv {
                    alias: r.alias.clone(),
                    path: f.path.clone(),
                },
                ResourceKind::Wav(f) => ResourceRecord::Wav {
                    alias: r.alias.clone(),
                    path: f.path.clone(),
                },
                ResourceKind::Array(a) => ResourceRecord::Array {
                    alias: r.alias.clone(),
                    data: a.clone(),
                },
            })
            .collect()
    }

    /// Re-create resources from session records. Entries that fail to load
    /// are logged and skipped; the rest keep their saved alias where it is
    /// still free. Returns the number restored.
    pub fn restore(&mut self, records: Vec<ResourceRecord>) -> usize {
        let mut restored = 0;
        for record in records {
            let result = match record {
                ResourceRecord::Csv { alias, path } | ResourceRecord::Wav { alias, path } => {
                    self.open_file_as(&path, &alias).map(|_| ())
                }
                ResourceRecord::Array { alias, data } if !data.is_consistent() => {
                    Err(ResourceError::BadShape {
                        alias,
                        rows: data.rows,
                        cols: data.cols,
                        len: data.values.len(),
                    })
                }
                ResourceRecord::Array { alias, data } => {
                    self.add_array(&alias, data);
                    Ok(())
                }
            };
            match result {
                Ok(()) => restored += 1,
                Err(e) => log::warn!("Skipping saved resource: {e}"),
            }
        }
        restored
    }

    fn push(&mut self, resource: Resource) -> &Resource {
        self.resources.push(resource);
        self.revision += 1;
        let last = self.resources.len() - 1;
        &self.resources[last]
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "a,b").unwrap();
        writeln!(f, "1,2").unwrap();
        path
    }

    #[test]
    fn unique_alias_counts_up() {
        let mut reg = ResourceRegistry::new();
        assert_eq!(reg.add_array("STF", NumericArray::column(vec![1.0])), "STF");
        assert_eq!(reg.add_array("STF", NumericArray::column(vec![2.0])), "STF_1");
        assert_eq!(reg.add_array("STF", NumericArray::column(vec![3.0])), "STF_2");
        reg.remove("STF_1").unwrap();
        assert_eq!(reg.unique_alias("STF"), "STF_1");
        assert_eq!(reg.unique_alias("  "), "resource");
    }

    #[test]
    fn no_alias_collisions_after_many_opens() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = ResourceRegistry::new();
        for i in 0..12 {
            let sub = dir.path().join(format!("session{i}"));
            std::fs::create_dir(&sub).unwrap();
            let path = write_csv(&sub, "calls.csv");
            reg.open_file(&path).unwrap();
            reg.add_array("calls", NumericArray::column(vec![i as f64]));
        }
        let aliases: BTreeSet<String> = reg.aliases().into_iter().collect();
        assert_eq!(aliases.len(), reg.len());
        assert_eq!(reg.len(), 24);
        assert!(aliases.contains("calls"));
        assert!(aliases.contains("calls_23"));
    }

    #[test]
    fn reopening_a_path_is_a_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "calls.csv");
        let mut reg = ResourceRegistry::new();
        reg.open_file(&path).unwrap();

        let again = dir.path().join(".").join("calls.csv");
        let err = reg.open_file(&again).unwrap_err();
        assert!(matches!(err, ResourceError::DuplicateResource(_)));
        assert!(err.is_user_facing());
        assert_eq!(reg.len(), 1);

        reg.remove("calls").unwrap();
        assert!(reg.open_file(&path).is_ok());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        let mut reg = ResourceRegistry::new();
        let err = reg.open_file(&path).unwrap_err();
        assert!(matches!(err, ResourceError::UnknownFileType(_)));
        assert!(reg.is_empty());
    }

    #[test]
    fn missing_file_is_not_found() {
        let mut reg = ResourceRegistry::new();
        let err = reg.open_file(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, ResourceError::NotFound(_)));
    }

    #[test]
    fn records_restore_into_fresh_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "calls.csv");
        let mut reg = ResourceRegistry::new();
        reg.open_file_as(&path, "my calls").unwrap();
        reg.add_array("derived", NumericArray::column(vec![1.0, 2.0]).with_sample_rate(Some(20.0)));

        let records = reg.records();
        let json = serde_json::to_string(&records).unwrap();
        let back: Vec<ResourceRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, records);

        let mut fresh = ResourceRegistry::new();
        let gone = ResourceRecord::Wav {
            alias: "gone".into(),
            path: dir.path().join("gone.wav"),
        };
        let mut with_missing = back;
        with_missing.push(gone);
        assert_eq!(fresh.restore(with_missing), 2);
        assert_eq!(fresh.aliases(), vec!["my calls", "derived"]);
        assert_eq!(fresh.get("derived").unwrap().sample_rate(), Some(20.0));
    }

    #[test]
    fn restore_skips_arrays_with_wrong_shape() {
        let mut broken = NumericArray::column(vec![1.0, 2.0]);
        broken.cols = 3;
        let records = vec![
            ResourceRecord::Array {
                alias: "broken".into(),
                data: broken,
            },
            ResourceRecord::Array {
                alias: "fine".into(),
                data: NumericArray::column(vec![1.0, 2.0]),
            },
        ];
        let mut reg = ResourceRegistry::new();
        assert_eq!(reg.restore(records), 1);
        assert_eq!(reg.aliases(), vec!["fine"]);
    }

    #[test]
    fn revision_tracks_changes() {
        let mut reg = ResourceRegistry::new();
        let start = reg.revision();
        reg.add_array("a", NumericArray::column(vec![1.0]));
        assert!(reg.revision() > start);
        let after_add = reg.revision();
        assert!(reg.remove("missing").is_err());
        assert_eq!(reg.revision(), after_add);
        reg.remove("a").unwrap();
        assert!(reg.revision() > after_add);
    }
}
