use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::resource::loader::FileType;

/// One row of the file browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

/// Directory listing cache for the file browser dock.
///
/// Directories are read on first expansion and kept until
/// [`FileBrowser::refresh`].
#[derive(Debug)]
pub struct FileBrowser {
    root: PathBuf,
    cache: BTreeMap<PathBuf, Vec<Entry>>,
    pub selected: Option<PathBuf>,
}

impl FileBrowser {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            cache: BTreeMap::new(),
            selected: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn set_root(&mut self, root: PathBuf) {
        self.root = root;
        self.refresh();
    }

    pub fn refresh(&mut self) {
        self.cache.clear();
    }

    /// Cached listing of `dir`.
    pub fn entries(&mut self, dir: &Path) -> &[Entry] {
        self.cache
            .entry(dir.to_path_buf())
            .or_insert_with(|| list_dir(dir))
    }
}

/// Subdirectories and supported files of `dir`, directories first, each
/// group sorted by name. Hidden entries are skipped; unreadable directories
/// list as empty.
pub fn list_dir(dir: &Path) -> Vec<Entry> {
    let read = match std::fs::read_dir(dir) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("Cannot list {}: {e}", dir.display());
            return Vec::new();
        }
    };
    let mut entries: Vec<Entry> = read
        .filter_map(Result::ok)
        .filter_map(|e| {
            let path = e.path();
            let name = e.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                return None;
            }
            let is_dir = path.is_dir();
            if !is_dir && FileType::from_path(&path).is_none() {
                return None;
            }
            Some(Entry { path, name, is_dir })
        })
        .collect();
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_dirs_first_and_only_supported_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("zeta")).unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();
        for name in ["b.wav", "a.csv", "notes.txt", "c.WAVE"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let names: Vec<String> = list_dir(dir.path()).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["zeta", "a.csv", "b.wav", "c.WAVE"]);
    }

    #[test]
    fn cache_is_cleared_on_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut browser = FileBrowser::new(dir.path().to_path_buf());
        assert!(browser.entries(dir.path()).is_empty());
        std::fs::write(dir.path().join("new.csv"), "").unwrap();
        assert!(browser.entries(dir.path()).is_empty());
        browser.refresh();
        assert_eq!(browser.entries(dir.path()).len(), 1);
    }
}
