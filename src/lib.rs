//! # Shoebox
//!
//! A content-addressed photo archive. Dump files in; shoebox stores one
//! canonical copy per unique content, remembers when each photo was taken
//! and how you tagged it, and keeps browsable date and tag indexes — all
//! as plain directories and symlinks.
//!
//! # Architecture: Hash → Link → Merge → Finalize
//!
//! Ingestion is a single sequential pipeline:
//!
//! ```text
//! 1. Hash      input file        →  ContentHash       (identity)
//! 2. Link      by_sha/<xx>/<rest>  (canonical object, symlink to original)
//! 3. Merge     sidecar record    →  filename, tags, derived capture date
//! 4. Finalize  save sidecar, refresh by_date/ and by_tag/ links
//! ```
//!
//! Steps 1–3 collect records into a pending batch; step 4 runs once after
//! all inputs are consumed. The split exists so resync mode (no inputs:
//! reload every known object) shares the finalize logic verbatim.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`hashing`] | `ContentHash`: SHA-1 fingerprinting and shard splitting |
//! | [`store`] | canonical path resolution, object creation, store enumeration |
//! | [`record`] | sidecar metadata: parse/serialize, field promotion, dates |
//! | [`index`] | by-date / by-tag relative symlink maintenance |
//! | [`embedded`] | EXIF/IPTC timestamp extraction from JPEG and TIFF |
//! | [`sync`] | the ingestion pipeline and its batch report |
//! | [`config`] | `shoebox.toml` loading and the documented stock config |
//! | [`output`] | diagnostic line formatting (pure functions, testable) |
//!
//! # Design Decisions
//!
//! ## The filesystem is the database
//!
//! There is no manifest or index file to corrupt or to drift out of date.
//! Identity is a sharded directory layout, metadata is a text sidecar
//! next to each object, and the secondary indexes are symlinks any file
//! browser can follow. `ls archive/by_tag/vacation/` is the query
//! language.
//!
//! ## Content is never copied
//!
//! The canonical object is a symlink to the original file, so an archive
//! over a quarter-terabyte photo collection costs directory entries, not
//! disk. The flip side — moving the originals breaks the links — is
//! accepted; the archive is an index over a collection, not a backup.
//!
//! ## Per-item failure, never per-run
//!
//! A batch of ten thousand photos with one unreadable file must ingest
//! nine thousand nine hundred ninety-nine. Every per-item problem
//! becomes a report entry and one stderr line naming the path or hash;
//! nothing short of an unreadable store root aborts a run.
//!
//! ## Strict sidecars
//!
//! A sidecar date that does not parse is an error, not a value to guess
//! at. Sidecars are also rewritten with sorted keys so two runs over the
//! same state produce byte-identical files.

pub mod config;
pub mod embedded;
pub mod hashing;
pub mod index;
pub mod output;
pub mod record;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_helpers;
