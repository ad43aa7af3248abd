//! Shared test utilities for the shoebox test suite.
//!
//! Provides temp-archive fixtures and record authoring helpers used by the
//! per-module `#[cfg(test)]` suites. Every fixture is an isolated
//! `TempDir` acting as the store base, so tests can mutate freely.

use std::path::Path;
use tempfile::TempDir;

use crate::config::{ShoeboxConfig, StoreSection};
use crate::hashing::ContentHash;
use crate::index::Indexer;
use crate::record::{FILENAME_KEY, MetadataRecord};
use crate::store::Store;

// =========================================================================
// Fixture setup
// =========================================================================

/// Config rooted at an arbitrary directory.
pub fn config_at(root: &Path) -> ShoeboxConfig {
    ShoeboxConfig {
        store: StoreSection {
            root: root.to_string_lossy().into_owned(),
        },
        ..ShoeboxConfig::default()
    }
}

/// Fresh store over a temp directory.
pub fn temp_store() -> (TempDir, Store) {
    let tmp = TempDir::new().unwrap();
    let store = Store::new(&config_at(tmp.path()));
    (tmp, store)
}

/// Fresh store and indexer over the same temp directory.
pub fn temp_archive() -> (TempDir, Store, Indexer) {
    let tmp = TempDir::new().unwrap();
    let config = config_at(tmp.path());
    (tmp, Store::new(&config), Indexer::new(&config))
}

// =========================================================================
// Source files and records
// =========================================================================

/// Write an input file under `<base>/sources/` and return its path.
pub fn source_file(store: &Store, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    // Shard by content so two sources may share a file name.
    let hash = ContentHash::of_bytes(bytes);
    let prefix = &hash.as_str()[..8];
    let dir = store.base().join("sources").join(prefix);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Write a raw sidecar for the given content and load it back.
pub fn write_sidecar(store: &Store, content: &[u8], sidecar: &str) -> MetadataRecord {
    let hash = ContentHash::of_bytes(content);
    let (_, meta) = store.paths_for(&hash, true).unwrap();
    std::fs::write(&meta, sidecar).unwrap();
    MetadataRecord::load(store, hash).unwrap()
}

/// Ingest `bytes` under `filename` and return its loaded record with the
/// filename set, after applying `customize` (add tags, set a date, …).
pub fn ingested_record(
    store: &Store,
    filename: &str,
    bytes: &[u8],
    customize: impl FnOnce(&mut MetadataRecord),
) -> MetadataRecord {
    let src = source_file(store, filename, bytes);
    let hash = ContentHash::of_file(&src).unwrap();
    store.ingest(&hash, &src).unwrap();
    let mut record = MetadataRecord::load(store, hash).unwrap();
    record.set(FILENAME_KEY, filename);
    customize(&mut record);
    record
}
