use dashmap::DashMap;
use glob::Pattern;
use rayon::prelude::*;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, error, warn};

use super::record::{FileRecord, ScannedDirectory};
use crate::config::{AppConfig, DirectoryRoot};
use crate::error::Error;

const ALWAYS_SKIPPED: &[&str] = &[".DS_Store"];

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub include_hidden: bool,
    pub ignore_patterns: Vec<Pattern>,
}

impl ScanOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        let ignore_patterns = config
            .ignore_patterns
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            include_hidden: config.include_hidden,
            ignore_patterns,
        }
    }

    fn skips(&self, name: &str, path: &Path, rel_path: &str) -> bool {
        if ALWAYS_SKIPPED.contains(&name) {
            return true;
        }
        if !self.include_hidden && name.starts_with('.') {
            return true;
        }
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path) || pattern.matches(rel_path))
    }
}

/// Parallel walk of one root. Returns its records sorted by relative path.
///
/// Unreadable directories and entries are logged and skipped. Symlinks are
/// recorded, never followed.
pub fn scan_directory(root: &DirectoryRoot, options: &ScanOptions) -> Result<ScannedDirectory, Error> {
    if !root.path.is_dir() {
        return Err(Error::InvalidRoot(root.path.clone()));
    }

    let map: DashMap<String, FileRecord> = DashMap::new();
    visit_dirs(&root.path, &root.path, &map, options);

    let mut records: Vec<FileRecord> = map.into_iter().map(|(_, rec)| rec).collect();
    records.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    debug!("[{}] {} records under {}", root.label, records.len(), root.path.display());

    Ok(ScannedDirectory::new(root.label.clone(), root.path.clone(), records))
}

fn visit_dirs(root: &Path, dir: &Path, map: &DashMap<String, FileRecord>, options: &ScanOptions) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() == io::ErrorKind::PermissionDenied {
                error!("Access denied reading directory {}: {}", dir.display(), err);
            } else {
                error!("Error reading directory {}: {}", dir.display(), err);
            }
            return;
        }
    };

    entries.par_bridge().for_each(|entry_result| {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                error!("Error reading entry in directory {}: {}", dir.display(), err);
                return;
            }
        };

        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel_path = relative_path(root, &path);
        if options.skips(&name, &path, &rel_path) {
            return;
        }

        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(err) => {
                error!("Error getting file type for {}: {}", path.display(), err);
                return;
            }
        };

        if file_type.is_symlink() {
            let target = match fs::canonicalize(&path) {
                Ok(resolved) => Some(resolved.to_string_lossy().into_owned()),
                Err(err) => {
                    warn!("Unresolvable symlink {}: {}", path.display(), err);
                    None
                }
            };
            let mod_time = fs::symlink_metadata(&path).ok().and_then(|m| modified_secs(&m));
            let record = FileRecord::symlink(root, &rel_path, target, mod_time).with_abs_path(path);
            map.insert(rel_path, record);
        } else if file_type.is_dir() {
            visit_dirs(root, &path, map, options);
        } else {
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    error!("Error getting metadata for {}: {}", path.display(), err);
                    return;
                }
            };
            let record = FileRecord::regular(root, &rel_path, metadata.len(), modified_secs(&metadata))
                .with_abs_path(path);
            map.insert(rel_path, record);
        }
    });
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(PathBuf::from)
        .unwrap_or_else(|_| path.to_path_buf())
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn modified_secs(metadata: &Metadata) -> Option<f64> {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
}
