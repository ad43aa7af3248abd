//! Secondary symlink indexes.
//!
//! Canonical objects are found by content hash; people look for photos by
//! date and by tag. The index trees provide those alternate entry points:
//!
//! ```text
//! <base>/by_date/2021/06/01/photo.jpg   ->  ../../../../by_sha/ab/c123…
//! <base>/by_tag/vacation/photo.jpg      ->  ../../by_sha/ab/c123…
//! ```
//!
//! Links are relative so the whole archive can be moved or mounted
//! elsewhere as a unit. They are (re)created on every sync cycle.
//!
//! Known limitations, accepted as one-directional synchronization:
//! - two objects sharing an original filename collide inside an index
//!   directory; the outcome is whatever the filesystem does;
//! - links created under previous tag or date values are never removed.

use crate::config::ShoeboxConfig;
use crate::hashing::ContentHash;
use crate::record::MetadataRecord;
use crate::store::BY_SHA;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("record {0} has no filename to name its index links")]
    NoFilename(ContentHash),
    #[error("cannot create index directory {path}: {source}")]
    Dir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot link {link} -> {target}: {source}")]
    Link {
        link: PathBuf,
        target: PathBuf,
        source: std::io::Error,
    },
}

/// Directory under the base holding the date index.
pub const BY_DATE: &str = "by_date";

/// Directory under the base holding the tag index.
pub const BY_TAG: &str = "by_tag";

/// Maintains the by-date and by-tag link trees for one base directory.
pub struct Indexer {
    base: PathBuf,
}

impl Indexer {
    pub fn new(config: &ShoeboxConfig) -> Self {
        Self {
            base: config.root().to_path_buf(),
        }
    }

    /// Refresh the secondary links for one record: the single derived
    /// `by_date/<YYYY>/<MM>/<DD>` link (when a date is present) and one
    /// `by_tag/<tag>` link per tag, each named after the record's
    /// original filename.
    ///
    /// Failures are collected per link, never fatal — an existing name, a
    /// permission problem, or an unwritable index directory affects only
    /// that link. An empty result means every link was created.
    pub fn relink(&self, record: &MetadataRecord) -> Vec<LinkError> {
        let Some(filename) = record.filename() else {
            return vec![LinkError::NoFilename(record.hash.clone())];
        };

        let mut index_dirs = Vec::new();
        if let Some(date) = record.date {
            index_dirs.push(
                self.base
                    .join(BY_DATE)
                    .join(format!("{:04}", date.year))
                    .join(format!("{:02}", date.month))
                    .join(format!("{:02}", date.day)),
            );
        }
        for tag in record.tags() {
            index_dirs.push(self.base.join(BY_TAG).join(tag));
        }

        let mut failures = Vec::new();
        for dir in index_dirs {
            if let Err(e) = self.link_into(&dir, filename, &record.hash) {
                failures.push(e);
            }
        }
        failures
    }

    /// Create `<dir>/<filename>` as a relative symlink back to the
    /// canonical object.
    fn link_into(&self, dir: &Path, filename: &str, hash: &ContentHash) -> Result<(), LinkError> {
        std::fs::create_dir_all(dir).map_err(|source| LinkError::Dir {
            path: dir.to_path_buf(),
            source,
        })?;
        let link = dir.join(filename);
        let target = self.relative_object_path(dir, hash);
        std::os::unix::fs::symlink(&target, &link).map_err(|source| LinkError::Link {
            link,
            target,
            source,
        })
    }

    /// Path of the canonical object relative to an index directory, built
    /// from the directory's depth below the base.
    fn relative_object_path(&self, index_dir: &Path, hash: &ContentHash) -> PathBuf {
        let depth = index_dir
            .strip_prefix(&self.base)
            .map(|p| p.components().count())
            .unwrap_or(0);
        let mut rel = PathBuf::new();
        for _ in 0..depth {
            rel.push("..");
        }
        let (shard, rest) = hash.shard();
        rel.join(BY_SHA).join(shard).join(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordDate;
    use crate::test_helpers::*;
    use std::fs;

    #[test]
    fn relink_creates_date_and_tag_links() {
        let (tmp, store, indexer) = temp_archive();
        let record = ingested_record(&store, "photo.jpg", b"pixels", |r| {
            r.date = Some(RecordDate::new(2021, 6, 1));
            r.push("tag", "vacation");
        });

        assert!(indexer.relink(&record).is_empty());

        let date_link = tmp.path().join("by_date/2021/06/01/photo.jpg");
        let tag_link = tmp.path().join("by_tag/vacation/photo.jpg");
        assert!(date_link.is_symlink());
        assert!(tag_link.is_symlink());

        let (shard, rest) = record.hash.shard();
        assert_eq!(
            fs::read_link(&date_link).unwrap(),
            PathBuf::from(format!("../../../../by_sha/{shard}/{rest}"))
        );
        assert_eq!(
            fs::read_link(&tag_link).unwrap(),
            PathBuf::from(format!("../../by_sha/{shard}/{rest}"))
        );

        // Both resolve to the same canonical object, which resolves to
        // the original bytes.
        assert_eq!(fs::read(&date_link).unwrap(), b"pixels");
        assert_eq!(fs::read(&tag_link).unwrap(), b"pixels");
    }

    #[test]
    fn relink_without_date_creates_only_tag_links() {
        let (tmp, store, indexer) = temp_archive();
        let record = ingested_record(&store, "photo.jpg", b"pixels", |r| {
            r.push("tag", "misc");
        });

        assert!(indexer.relink(&record).is_empty());
        assert!(tmp.path().join("by_tag/misc/photo.jpg").is_symlink());
        assert!(!tmp.path().join("by_date").exists());
    }

    #[test]
    fn relink_without_tags_creates_only_date_link() {
        let (tmp, store, indexer) = temp_archive();
        let record = ingested_record(&store, "photo.jpg", b"pixels", |r| {
            r.date = Some(RecordDate::new(2021, 6, 1));
        });

        assert!(indexer.relink(&record).is_empty());
        assert!(tmp.path().join("by_date/2021/06/01/photo.jpg").is_symlink());
        assert!(!tmp.path().join("by_tag").exists());
    }

    #[test]
    fn missing_filename_is_reported() {
        let (_tmp, store, indexer) = temp_archive();
        // A sidecar that never went through ingest (no filename field),
        // as a resync can encounter.
        let record = write_sidecar(&store, b"pixels", "tag: vacation\n");

        let failures = indexer.relink(&record);
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], LinkError::NoFilename(_)));
    }

    #[test]
    fn colliding_filename_fails_that_link_only() {
        let (tmp, store, indexer) = temp_archive();
        let first = ingested_record(&store, "photo.jpg", b"first", |r| {
            r.push("tag", "vacation");
        });
        let second = ingested_record(&store, "photo.jpg", b"second", |r| {
            r.push("tag", "vacation");
            r.push("tag", "beach");
        });

        assert!(indexer.relink(&first).is_empty());
        let failures = indexer.relink(&second);

        // The vacation link collides; the beach link still lands.
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], LinkError::Link { .. }));
        assert!(tmp.path().join("by_tag/beach/photo.jpg").is_symlink());

        // The survivor still points at the first object.
        let (shard, rest) = first.hash.shard();
        assert_eq!(
            fs::read_link(tmp.path().join("by_tag/vacation/photo.jpg")).unwrap(),
            PathBuf::from(format!("../../by_sha/{shard}/{rest}"))
        );
    }

    #[test]
    fn stale_links_survive_a_tag_change() {
        let (tmp, store, indexer) = temp_archive();
        let mut record = ingested_record(&store, "photo.jpg", b"pixels", |r| {
            r.push("tag", "draft");
        });
        assert!(indexer.relink(&record).is_empty());

        // Add a tag and relink: the new link lands, recreating the
        // existing draft link fails, and nothing is cleaned up.
        record.push("tag", "final");
        let failures = indexer.relink(&record);
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], LinkError::Link { .. }));
        assert!(tmp.path().join("by_tag/draft/photo.jpg").is_symlink());
        assert!(tmp.path().join("by_tag/final/photo.jpg").is_symlink());
    }
}
