use dashmap::DashMap;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

use super::ContentDigest;

/// Remembers one digest outcome per path for the lifetime of a run, so a file
/// compared against several directories is read once. Failures are cached too.
pub struct CachedDigest<D> {
    inner: D,
    cache: DashMap<PathBuf, Option<u64>>,
}

impl<D: ContentDigest> CachedDigest<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.cache.iter().filter(|e| e.value().is_none()).count()
    }
}

impl<D: ContentDigest> ContentDigest for CachedDigest<D> {
    fn digest(&self, path: &Path) -> io::Result<u64> {
        if let Some(cached) = self.cache.get(path) {
            trace!("Found digest for {} in cache", path.display());
            return cached
                .value()
                .ok_or_else(|| io::Error::new(ErrorKind::Other, "digest previously failed"));
        }

        let outcome = self.inner.digest(path);
        if let Err(e) = &outcome {
            warn!("Could not digest '{}': {}", path.display(), e);
        }
        self.cache
            .insert(path.to_path_buf(), outcome.as_ref().ok().copied());
        outcome
    }
}
