//! Content fingerprinting.
//!
//! Every ingested file is identified by the SHA-1 digest of its full byte
//! content, rendered as 40 lowercase hex characters. The digest is the
//! identity key for the whole archive: two files with identical bytes map
//! to the same canonical object no matter where they came from or what
//! they were called.
//!
//! The digest is content-based rather than mtime-based so it survives
//! copies, renames, and `git checkout` (which resets modification times).

use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("not a content hash: {0:?}")]
    Malformed(String),
}

/// Hex length of a SHA-1 digest.
pub const HASH_LEN: usize = 40;

/// Number of leading hex characters used as the shard directory name.
pub const SHARD_LEN: usize = 2;

/// A 160-bit content fingerprint as 40 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash a file's full content.
    ///
    /// Reads the whole file into memory; photographs are tens of
    /// megabytes at worst, and the archive is built one file at a time.
    pub fn of_file(path: &Path) -> Result<Self, HashError> {
        let bytes = std::fs::read(path).map_err(|source| HashError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::of_bytes(&bytes))
    }

    /// Hash a byte slice directly.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        ContentHash(format!("{:x}", Sha1::digest(bytes)))
    }

    /// Validate a hash string reconstructed from on-disk names.
    ///
    /// Used when enumerating the store, where `<xx>/<rest>` directory and
    /// file names are joined back into a hash.
    pub fn parse(s: &str) -> Result<Self, HashError> {
        if s.len() == HASH_LEN && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
        {
            Ok(ContentHash(s.to_string()))
        } else {
            Err(HashError::Malformed(s.to_string()))
        }
    }

    /// Split into `(shard, rest)`: the first two hex characters name the
    /// shard directory, the remaining 38 name the object file.
    pub fn shard(&self) -> (&str, &str) {
        self.0.split_at(SHARD_LEN)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn hash_is_40_lowercase_hex() {
        let h = ContentHash::of_bytes(b"hello world");
        assert_eq!(h.as_str().len(), 40);
        assert!(h.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h.as_str(), h.as_str().to_lowercase());
    }

    #[test]
    fn hash_depends_only_on_content() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("sub").join("renamed.jpg");
        fs::create_dir_all(b.parent().unwrap()).unwrap();
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();

        assert_eq!(
            ContentHash::of_file(&a).unwrap(),
            ContentHash::of_file(&b).unwrap()
        );
    }

    #[test]
    fn hash_changes_with_content() {
        assert_ne!(
            ContentHash::of_bytes(b"version 1"),
            ContentHash::of_bytes(b"version 2")
        );
    }

    #[test]
    fn hash_missing_file_is_read_error() {
        let err = ContentHash::of_file(Path::new("/nonexistent/photo.jpg")).unwrap_err();
        assert!(matches!(err, HashError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/photo.jpg"));
    }

    #[test]
    fn shard_splits_first_two_chars() {
        let h = ContentHash::parse("abc1230000000000000000000000000000000000").unwrap();
        let (dir, rest) = h.shard();
        assert_eq!(dir, "ab");
        assert_eq!(rest, "c1230000000000000000000000000000000000");
        assert_eq!(rest.len(), 38);
    }

    #[test]
    fn parse_accepts_real_digest() {
        let h = ContentHash::of_bytes(b"x");
        assert_eq!(ContentHash::parse(h.as_str()).unwrap(), h);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(ContentHash::parse("short").is_err());
        assert!(ContentHash::parse("g".repeat(40).as_str()).is_err());
        assert!(ContentHash::parse("AB".repeat(20).as_str()).is_err());
        assert!(ContentHash::parse("").is_err());
    }
}
