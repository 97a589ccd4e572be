pub mod cache;
pub mod xxhash;

use std::io;
use std::path::Path;

pub use cache::CachedDigest;
pub use xxhash::XxHashDigest;

/// Content digest of a whole file. Any error means "could not verify"; callers
/// never inspect the reason.
pub trait ContentDigest: Send + Sync {
    fn digest(&self, path: &Path) -> io::Result<u64>;
}

impl<D: ContentDigest + ?Sized> ContentDigest for &D {
    fn digest(&self, path: &Path) -> io::Result<u64> {
        (**self).digest(path)
    }
}
