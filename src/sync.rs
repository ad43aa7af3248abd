//! The ingestion pipeline.
//!
//! Per input path, in order: hash the content, create/confirm the
//! canonical object, load and merge the metadata record, and append it to
//! a pending batch. After all inputs are consumed the batch is finalized:
//! every pending record is saved and its secondary links refreshed.
//!
//! With no inputs at all the pipeline switches to resync mode: every hash
//! the store knows is loaded into the batch instead. The two-phase
//! collect-then-finalize shape exists exactly so both modes share the
//! finalize logic.
//!
//! ## Partial failure
//!
//! One bad item never aborts the run. Every per-item problem (unreadable
//! input, malformed sidecar, failed link) becomes one [`ItemFailure`] in
//! the [`SyncReport`] and exactly one diagnostic line on stderr naming
//! the offending path or hash. Only unrecoverable conditions (an
//! unreadable store root) fail the pipeline itself.
//!
//! A canonical link that already exists is the expected shape of a
//! re-ingest; it is counted as a link problem and the item proceeds to
//! the metadata merge, which is what makes re-ingesting a tagged batch
//! idempotent.
//!
//! ## Durability
//!
//! Strictly sequential and synchronous. If the process dies mid-run,
//! records already finalized are durable; the pending batch is lost.
//! There is no locking around the sidecar read-modify-save sequence or
//! around link creation: two processes syncing the same store can lose
//! one side's updates or report spurious link failures. Single-process
//! use is the supported shape.

use crate::config::ShoeboxConfig;
use crate::embedded::DateSource;
use crate::hashing::ContentHash;
use crate::index::Indexer;
use crate::output;
use crate::record::{FILENAME_KEY, MetadataRecord, TAG_KEY};
use crate::store::{Store, StoreError};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// One failed item (input path or stored record) with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    /// The offending input path or content hash.
    pub subject: String,
    pub reason: String,
}

/// Outcome of one sync run.
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    /// Records saved and relinked.
    pub synced: usize,
    /// Items that failed outright (never finalized).
    pub failed: usize,
    /// Non-fatal link problems: canonical re-links and secondary-index
    /// collisions. These do not fail their item.
    pub link_failures: usize,
    pub failures: Vec<ItemFailure>,
}

impl SyncReport {
    fn fail(&mut self, subject: impl Into<String>, reason: impl fmt::Display) {
        let failure = ItemFailure {
            subject: subject.into(),
            reason: reason.to_string(),
        };
        eprintln!("{}", output::format_item_failure(&failure));
        self.failures.push(failure);
        self.failed += 1;
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} synced, {} failed", self.synced, self.failed)?;
        if self.link_failures > 0 {
            write!(f, ", {} link problems", self.link_failures)?;
        }
        Ok(())
    }
}

/// Ingest a stream of input paths, then finalize the batch.
///
/// `tags` are merged into every ingested record (skipping values the
/// record already carries). With zero inputs this falls back to
/// [`resync`].
pub fn sync_paths(
    config: &ShoeboxConfig,
    dates: &impl DateSource,
    inputs: impl IntoIterator<Item = String>,
    tags: &[String],
) -> Result<SyncReport, StoreError> {
    let store = Store::new(config);
    let indexer = Indexer::new(config);
    let mut report = SyncReport::default();
    let mut pending = Vec::new();
    let mut count = 0usize;

    for line in inputs {
        count += 1;
        match ingest_one(&store, dates, &line, tags, &mut report) {
            Ok(record) => pending.push(record),
            Err(reason) => report.fail(line.as_str(), reason),
        }
        if count % config.sync.progress_every == 0 {
            eprintln!("{}", output::format_progress(count));
        }
    }

    if count == 0 {
        return resync(config);
    }

    finalize(&indexer, pending, &mut report);
    Ok(report)
}

/// Reprocess every object the store already knows: load each record and
/// finalize it. Dates are never recomputed and filenames never touched —
/// resync only rewrites sidecars and refreshes links.
pub fn resync(config: &ShoeboxConfig) -> Result<SyncReport, StoreError> {
    let store = Store::new(config);
    let indexer = Indexer::new(config);
    let mut report = SyncReport::default();
    let mut pending = Vec::new();

    for hash in store.list_all()? {
        match MetadataRecord::load(&store, hash.clone()) {
            Ok(record) => pending.push(record),
            Err(reason) => report.fail(hash.as_str(), reason),
        }
    }

    finalize(&indexer, pending, &mut report);
    Ok(report)
}

/// Hash, link and merge one input path into a pending record.
///
/// Returns the per-item failure reason as a value; the caller turns it
/// into a report entry. Link problems are logged here but do not fail
/// the item.
fn ingest_one(
    store: &Store,
    dates: &impl DateSource,
    input: &str,
    tags: &[String],
    report: &mut SyncReport,
) -> Result<MetadataRecord, String> {
    let path = Path::new(input);
    let hash = ContentHash::of_file(path).map_err(|e| e.to_string())?;

    if let Err(e) = store.ingest(&hash, path) {
        eprintln!("{}", output::format_link_problem(&e));
        report.link_failures += 1;
    }

    let mut record = MetadataRecord::load(store, hash).map_err(|e| e.to_string())?;

    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        record.set(FILENAME_KEY, name);
    }
    for tag in tags {
        record.push_unless_present(TAG_KEY, tag);
    }

    if record.date.is_none() {
        let extraction = dates.extract(path).map_err(|e| e.to_string())?;
        for warning in &extraction.warnings {
            eprintln!("{}", output::format_date_warning(input, warning));
        }
        record.merge_date(&extraction.candidates);
    }

    Ok(record)
}

/// Persist and relink every pending record.
fn finalize(indexer: &Indexer, pending: Vec<MetadataRecord>, report: &mut SyncReport) {
    for record in pending {
        eprintln!("{}", output::format_sync_notice(&record.hash));
        if let Err(reason) = record.save() {
            report.fail(record.hash.as_str(), reason);
            continue;
        }
        for problem in indexer.relink(&record) {
            eprintln!("{}", output::format_link_problem(&problem));
            report.link_failures += 1;
        }
        report.synced += 1;
    }
}
