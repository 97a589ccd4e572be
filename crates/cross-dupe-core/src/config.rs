use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_mtime_fuzz")]
    pub mtime_fuzz_seconds: f64,
    #[serde(default = "default_true")]
    pub use_checksum: bool,
    #[serde(default)]
    pub include_hidden: bool,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

fn default_mtime_fuzz() -> f64 {
    5.0
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mtime_fuzz_seconds: default_mtime_fuzz(),
            use_checksum: true,
            include_hidden: false,
            ignore_patterns: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !self.mtime_fuzz_seconds.is_finite() || self.mtime_fuzz_seconds < 0.0 {
            return Err(Error::Other(format!(
                "mtime_fuzz_seconds must be a non-negative number, got {}",
                self.mtime_fuzz_seconds
            )));
        }
        Ok(())
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            mtime_fuzz_seconds: self.mtime_fuzz_seconds,
            use_checksum: self.use_checksum,
        }
    }
}

/// The subset of configuration the classifier looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchOptions {
    pub mtime_fuzz_seconds: f64,
    pub use_checksum: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        AppConfig::default().match_options()
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("CROSS_DUPE")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// One directory tree taking part in a reconciliation, named by a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryRoot {
    pub label: String,
    pub path: PathBuf,
}

impl DirectoryRoot {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// Parse `"Label:/some/path"` or a bare path. Paths have a leading `~`
    /// expanded and are canonicalized when they exist. A bare path is labelled
    /// by the last component of the resolved path.
    pub fn parse(raw: &str) -> Self {
        if let Some((label, path)) = raw
            .split_once(':')
            .filter(|_| !raw.starts_with('/') && !raw.starts_with('~'))
            .filter(|(label, _)| !label.trim().is_empty())
        {
            return Self::new(label.trim(), resolve_path(path.trim()));
        }

        let path = resolve_path(raw);
        Self::new(label_for_path(&path), path)
    }
}

fn expand_home(raw: &str) -> PathBuf {
    let rest = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(raw),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(raw),
    }
}

/// Expand `~` and canonicalize; a path that cannot be resolved is kept as
/// expanded so the scan reports it.
fn resolve_path(raw: &str) -> PathBuf {
    let expanded = expand_home(raw);
    fs::canonicalize(&expanded).unwrap_or(expanded)
}

fn label_for_path(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Reject root lists the engine cannot reconcile: fewer than two entries or
/// a label used twice.
pub fn check_roots(roots: &[DirectoryRoot]) -> Result<(), Error> {
    if roots.len() < 2 {
        return Err(Error::TooFewRoots(roots.len()));
    }
    for (i, root) in roots.iter().enumerate() {
        if roots[..i].iter().any(|r| r.label == root.label) {
            return Err(Error::DuplicateLabel(root.label.clone()));
        }
    }
    Ok(())
}
