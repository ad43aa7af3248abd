//! Canonical object storage.
//!
//! One unique file content = one canonical object. The object lives at a
//! deterministic sharded path derived purely from its content hash:
//!
//! ```text
//! <base>/by_sha/ab/c123…   # "ab" = first 2 hex chars, rest = file name
//! <base>/by_sha/ab/c123….meta   # metadata sidecar (see `record`)
//! ```
//!
//! The canonical object is a symbolic link to the original ingested file —
//! content is never copied. The store only resolves and creates canonical
//! paths; secondary-index mutation lives in [`crate::index`] so a different
//! index backend could replace link-based indexing without touching path
//! resolution.

use crate::config::ShoeboxConfig;
use crate::hashing::ContentHash;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot link {link} -> {target}: {source}")]
    Link {
        link: PathBuf,
        target: PathBuf,
        source: std::io::Error,
    },
}

/// Directory under the base holding the canonical sharded tree.
pub const BY_SHA: &str = "by_sha";

/// Extension of metadata sidecar files.
pub const META_EXT: &str = "meta";

/// Resolves and creates canonical objects under one base directory.
pub struct Store {
    base: PathBuf,
}

impl Store {
    pub fn new(config: &ShoeboxConfig) -> Self {
        Self {
            base: config.root().to_path_buf(),
        }
    }

    /// Canonical and sidecar paths for a hash.
    ///
    /// With `create_parent` the shard directory is created if missing.
    pub fn paths_for(
        &self,
        hash: &ContentHash,
        create_parent: bool,
    ) -> Result<(PathBuf, PathBuf), StoreError> {
        let (shard, rest) = hash.shard();
        let shard_dir = self.base.join(BY_SHA).join(shard);
        if create_parent {
            std::fs::create_dir_all(&shard_dir)?;
        }
        let object = shard_dir.join(rest);
        let sidecar = shard_dir.join(format!("{rest}.{META_EXT}"));
        Ok((object, sidecar))
    }

    /// Create the canonical object: a symlink at the sharded path pointing
    /// at `source`, exactly as supplied.
    ///
    /// Best-effort idempotence: if the object already exists the creation
    /// fails and the caller logs it as a per-item problem. The existing
    /// target is never overwritten or validated.
    pub fn ingest(&self, hash: &ContentHash, source: &Path) -> Result<(), StoreError> {
        let (object, _) = self.paths_for(hash, true)?;
        std::os::unix::fs::symlink(source, &object).map_err(|e| StoreError::Link {
            link: object,
            target: source.to_path_buf(),
            source: e,
        })
    }

    /// Enumerate every known object by reconstructing hashes from the
    /// sharded tree (`<xx>` directory name + object file name).
    ///
    /// Sidecars and names that do not join into a valid hash are skipped.
    /// A store with no `by_sha` tree yet is simply empty. The listing is
    /// sorted, so repeated calls over an unchanged store agree.
    pub fn list_all(&self) -> Result<Vec<ContentHash>, StoreError> {
        let root = self.base.join(BY_SHA);
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut hashes = Vec::new();
        for entry in WalkDir::new(&root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
            if entry.file_type().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if name.ends_with(&format!(".{META_EXT}")) {
                continue;
            }
            let Some(shard) = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .and_then(|s| s.to_str())
            else {
                continue;
            };
            if let Ok(hash) = ContentHash::parse(&format!("{shard}{name}")) {
                hashes.push(hash);
            }
        }
        Ok(hashes)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::fs;

    #[test]
    fn paths_follow_two_level_sharding() {
        let (tmp, store) = temp_store();
        let hash = ContentHash::parse("abc1230000000000000000000000000000000000").unwrap();

        let (object, sidecar) = store.paths_for(&hash, false).unwrap();
        assert_eq!(
            object,
            tmp.path()
                .join("by_sha/ab/c1230000000000000000000000000000000000")
        );
        assert_eq!(
            sidecar,
            tmp.path()
                .join("by_sha/ab/c1230000000000000000000000000000000000.meta")
        );
    }

    #[test]
    fn paths_for_creates_shard_dir_on_demand() {
        let (tmp, store) = temp_store();
        let hash = ContentHash::of_bytes(b"x");

        store.paths_for(&hash, false).unwrap();
        assert!(!tmp.path().join("by_sha").exists());

        let (object, _) = store.paths_for(&hash, true).unwrap();
        assert!(object.parent().unwrap().is_dir());
    }

    #[test]
    fn ingest_links_canonical_object_to_source() {
        let (_tmp, store) = temp_store();
        let src = source_file(&store, "photo.jpg", b"pixels");
        let hash = ContentHash::of_file(&src).unwrap();

        store.ingest(&hash, &src).unwrap();

        let (object, _) = store.paths_for(&hash, false).unwrap();
        assert!(object.is_symlink());
        assert_eq!(fs::read_link(&object).unwrap(), src);
        assert_eq!(fs::read(&object).unwrap(), b"pixels");
    }

    #[test]
    fn second_ingest_of_same_content_fails_without_touching_object() {
        let (_tmp, store) = temp_store();
        let src = source_file(&store, "photo.jpg", b"pixels");
        let copy = source_file(&store, "copy.jpg", b"pixels");
        let hash = ContentHash::of_file(&src).unwrap();

        store.ingest(&hash, &src).unwrap();
        let err = store.ingest(&hash, &copy).unwrap_err();
        assert!(matches!(err, StoreError::Link { .. }));

        // First link untouched
        let (object, _) = store.paths_for(&hash, false).unwrap();
        assert_eq!(fs::read_link(&object).unwrap(), src);
    }

    #[test]
    fn list_all_reconstructs_hashes_and_skips_sidecars() {
        let (_tmp, store) = temp_store();
        let a = source_file(&store, "a.jpg", b"content a");
        let b = source_file(&store, "b.jpg", b"content b");
        let ha = ContentHash::of_file(&a).unwrap();
        let hb = ContentHash::of_file(&b).unwrap();
        store.ingest(&ha, &a).unwrap();
        store.ingest(&hb, &b).unwrap();

        // Sidecar next to one object must not show up as an extra hash
        let (_, sidecar) = store.paths_for(&ha, false).unwrap();
        fs::write(&sidecar, "tag: test\n").unwrap();

        let mut expected = vec![ha, hb];
        expected.sort();
        assert_eq!(store.list_all().unwrap(), expected);
    }

    #[test]
    fn list_all_of_empty_store_is_empty() {
        let (_tmp, store) = temp_store();
        assert_eq!(store.list_all().unwrap(), Vec::new());
    }

    #[test]
    fn list_all_skips_foreign_files() {
        let (tmp, store) = temp_store();
        let shard = tmp.path().join("by_sha").join("zz");
        fs::create_dir_all(&shard).unwrap();
        fs::write(shard.join("not-a-hash"), "junk").unwrap();

        assert_eq!(store.list_all().unwrap(), Vec::new());
    }
}
