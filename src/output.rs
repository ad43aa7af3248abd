//! Diagnostic output formatting.
//!
//! All progress counters, per-record sync notices, failure lines and
//! warnings go to stderr; stdout carries only primary output (`list`,
//! `gen-config`). Every problem produces exactly one line naming the
//! failing path or hash, so a run's stderr can be grepped per item.
//!
//! Format functions are pure — no I/O, no side effects — so the text
//! contract is testable; callers print the returned lines.

use crate::embedded::DateWarning;
use crate::hashing::ContentHash;
use crate::sync::{ItemFailure, SyncReport};
use std::fmt;

/// Progress notice, emitted every `sync.progress_every` items.
pub fn format_progress(count: usize) -> String {
    format!("  {count} items")
}

/// Per-record notice emitted when a pending record is finalized.
pub fn format_sync_notice(hash: &ContentHash) -> String {
    format!("sync {hash}")
}

/// The one diagnostic line for a failed item.
pub fn format_item_failure(failure: &ItemFailure) -> String {
    format!("failed {}: {}", failure.subject, failure.reason)
}

/// The one diagnostic line for a non-fatal link problem.
pub fn format_link_problem(problem: &impl fmt::Display) -> String {
    format!("link problem: {problem}")
}

/// The one diagnostic line for an unparseable embedded timestamp.
pub fn format_date_warning(input: &str, warning: &DateWarning) -> String {
    format!("warning {input}: {warning}")
}

/// End-of-run summary.
pub fn format_report(report: &SyncReport) -> String {
    format!("==> Sync complete: {report}")
}
