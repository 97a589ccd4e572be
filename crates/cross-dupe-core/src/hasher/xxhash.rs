use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;
use twox_hash::XxHash64;

use super::ContentDigest;

const READ_CHUNK_LENGTH: usize = 1 << 20; // 1MB

/// Streaming XxHash64 over the full file contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct XxHashDigest;

impl ContentDigest for XxHashDigest {
    fn digest(&self, path: &Path) -> io::Result<u64> {
        hash_file(path)
    }
}

pub fn hash_file(file: &Path) -> io::Result<u64> {
    let mut f = File::open(file)?;
    let mut hasher = XxHash64::with_seed(0);
    let mut buffer = vec![0; READ_CHUNK_LENGTH];
    loop {
        let bytes_read = f.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.write(&buffer[..bytes_read]);
    }
    Ok(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn hash_data(data: &[u8]) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(data);
        hasher.finish()
    }

    #[test]
    fn test_file_hash_matches_data_hash() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("f.txt");
        fs::write(&path, b"hello").unwrap();
        assert_eq!(XxHashDigest.digest(&path).unwrap(), hash_data(b"hello"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let tmp = tempdir().unwrap();
        assert!(XxHashDigest.digest(&tmp.path().join("missing")).is_err());
    }
}
