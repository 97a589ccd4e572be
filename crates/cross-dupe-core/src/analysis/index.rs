use ahash::AHashMap;
use serde::Serialize;
use std::collections::hash_map::Keys;

use crate::scanner::{EntryKind, FileRecord, ScannedDirectory};

/// Size component of a match key. Symlinks get their own bucket so they never
/// meet a same-named empty file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum KeySize {
    Bytes(u64),
    Link,
}

/// `(case-folded name, size)`: the candidate key for cross-directory matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MatchKey {
    pub name_key: String,
    pub size: KeySize,
}

impl MatchKey {
    pub fn of(record: &FileRecord) -> Self {
        let size = match record.kind {
            EntryKind::Regular { size } => KeySize::Bytes(size),
            EntryKind::Symlink { .. } => KeySize::Link,
        };
        Self {
            name_key: record.name_key.clone(),
            size,
        }
    }
}

/// Lookup tables over one directory's records, built once and read-only after.
pub struct CandidateIndex<'a> {
    pub label: &'a str,
    by_key: AHashMap<MatchKey, Vec<&'a FileRecord>>,
    by_path: AHashMap<String, &'a FileRecord>,
}

impl<'a> CandidateIndex<'a> {
    pub fn build(dir: &'a ScannedDirectory) -> Self {
        let mut by_key: AHashMap<MatchKey, Vec<&'a FileRecord>> = AHashMap::new();
        let mut by_path: AHashMap<String, &'a FileRecord> = AHashMap::new();

        for record in &dir.records {
            by_key.entry(MatchKey::of(record)).or_default().push(record);
            by_path.entry(record.path_key()).or_insert(record);
        }

        Self {
            label: &dir.label,
            by_key,
            by_path,
        }
    }

    /// First record carrying `key`. Further records with the same key in this
    /// directory are not considered.
    pub fn first(&self, key: &MatchKey) -> Option<&'a FileRecord> {
        self.by_key.get(key).and_then(|hits| hits.first().copied())
    }

    pub fn by_path(&self, path_key: &str) -> Option<&'a FileRecord> {
        self.by_path.get(path_key).copied()
    }

    pub fn keys(&self) -> Keys<'_, MatchKey, Vec<&'a FileRecord>> {
        self.by_key.keys()
    }

    pub fn path_keys(&self) -> Keys<'_, String, &'a FileRecord> {
        self.by_path.keys()
    }

    /// Keys that map to more than one record in this directory.
    pub fn ambiguous_keys(&self) -> usize {
        self.by_key.values().filter(|hits| hits.len() > 1).count()
    }
}
