use serde::Serialize;
use std::path::{Path, PathBuf};

/// Output name of the folder holding entries directly under a root. Internally
/// that folder is the empty path, so a real folder named `(root)` stays apart.
pub const ROOT_FOLDER: &str = "(root)";

/// What kind of filesystem entry a record describes. Only regular files have a
/// size or content; symlinks are compared by their resolved target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    Regular { size: u64 },
    Symlink { target: Option<String> },
}

/// One entry found under one root. Immutable once scanned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    /// Root-relative, `/`-separated.
    pub rel_path: String,
    /// Case-folded base name.
    pub name_key: String,
    pub name_display: String,
    #[serde(skip)]
    pub abs_path: PathBuf,
    /// Seconds since the epoch, `None` when the scanner could not tell.
    pub mod_time: Option<f64>,
    pub kind: EntryKind,
}

impl FileRecord {
    pub fn regular(root: &Path, rel_path: &str, size: u64, mod_time: Option<f64>) -> Self {
        Self::new(root, rel_path, mod_time, EntryKind::Regular { size })
    }

    pub fn symlink(
        root: &Path,
        rel_path: &str,
        target: Option<String>,
        mod_time: Option<f64>,
    ) -> Self {
        Self::new(root, rel_path, mod_time, EntryKind::Symlink { target })
    }

    fn new(root: &Path, rel_path: &str, mod_time: Option<f64>, kind: EntryKind) -> Self {
        let rel_path = normalize_rel_path(rel_path);
        let name_display = rel_path
            .rsplit('/')
            .next()
            .unwrap_or(rel_path.as_str())
            .to_string();
        let abs_path = rel_path
            .split('/')
            .fold(root.to_path_buf(), |acc, part| acc.join(part));

        Self {
            name_key: name_display.to_lowercase(),
            name_display,
            abs_path,
            rel_path,
            mod_time,
            kind,
        }
    }

    /// Use the path as found on disk instead of one rebuilt from `rel_path`,
    /// which is lossy for names that are not UTF-8.
    pub fn with_abs_path(mut self, abs_path: PathBuf) -> Self {
        self.abs_path = abs_path;
        self
    }

    pub fn is_link(&self) -> bool {
        matches!(self.kind, EntryKind::Symlink { .. })
    }

    pub fn size(&self) -> Option<u64> {
        match self.kind {
            EntryKind::Regular { size } => Some(size),
            EntryKind::Symlink { .. } => None,
        }
    }

    pub fn link_target(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Symlink { target } => target.as_deref(),
            EntryKind::Regular { .. } => None,
        }
    }

    /// Parent folder of this record; empty for top-level entries.
    pub fn folder(&self) -> &str {
        self.rel_path
            .rsplit_once('/')
            .map(|(parent, _)| parent)
            .unwrap_or("")
    }

    pub fn path_key(&self) -> String {
        self.rel_path.to_lowercase()
    }
}

/// The records scanned from one labelled root.
#[derive(Debug, Clone, Serialize)]
pub struct ScannedDirectory {
    pub label: String,
    pub root: PathBuf,
    #[serde(skip)]
    pub records: Vec<FileRecord>,
}

impl ScannedDirectory {
    pub fn new(label: impl Into<String>, root: impl Into<PathBuf>, records: Vec<FileRecord>) -> Self {
        Self {
            label: label.into(),
            root: root.into(),
            records,
        }
    }
}

fn normalize_rel_path(raw: &str) -> String {
    raw.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}
