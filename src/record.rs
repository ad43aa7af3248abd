//! Metadata records and the sidecar file format.
//!
//! Every canonical object carries exactly one metadata record, persisted
//! as a plain-text sidecar next to the object (`<object>.meta`). The
//! format is one `key: value` pair per line:
//!
//! ```text
//! date: 2021-06-01
//! filename: photo.jpg
//! tag: vacation
//! tag: beach
//! ```
//!
//! - Keys are written in sorted order, so saving is reproducible.
//! - A literal colon inside a key is escaped as `\:`.
//! - A multi-valued key appears as repeated lines, one value per line,
//!   in insertion order.
//!
//! ## Field promotion
//!
//! Attribute values are scalars until a second value arrives for the same
//! key, which promotes the field to an ordered list ([`Value::push`]).
//! Insertion order is preserved through every load/save cycle and
//! duplicates are allowed.
//!
//! ## The `date` field
//!
//! `date` is special-cased: it is a validated `(year, month, day)` triple,
//! serialized zero-padded as `YYYY-MM-DD`. A sidecar whose date line does
//! not match that shape exactly fails the load — it is never coerced or
//! auto-corrected. Once a record has a date it is never recomputed from
//! the file's embedded timestamps on later syncs.

use crate::hashing::ContentHash;
use crate::store::Store;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),
    #[error("sidecar line has no key separator: {0:?}")]
    BadLine(String),
    #[error("invalid date {0:?} (expected YYYY-MM-DD)")]
    BadDate(String),
    #[error("duplicate date line in sidecar")]
    DuplicateDate,
}

/// A metadata attribute value: a scalar until a second value for the same
/// key promotes it to an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
}

impl Value {
    /// Promotion: Scalar + second value → two-element List (first-seen
    /// value first); List + value → append. Duplicates are kept.
    pub fn push(&mut self, value: String) {
        match self {
            Value::Scalar(first) => {
                *self = Value::List(vec![std::mem::take(first), value]);
            }
            Value::List(items) => items.push(value),
        }
    }

    /// All values in order (a scalar is a one-element sequence).
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        match self {
            Value::Scalar(s) => std::slice::from_ref(s).iter(),
            Value::List(items) => items.iter(),
        }
        .map(String::as_str)
    }

    /// The most recently written value.
    pub fn last(&self) -> &str {
        match self {
            Value::Scalar(s) => s,
            Value::List(items) => items.last().expect("list value is never empty"),
        }
    }
}

/// A capture date as stored in the sidecar.
///
/// Deliberately not a calendar type: the date reduction in
/// [`RecordDate::component_min`] can produce day/month combinations no
/// calendar accepts, and those values must still round-trip through the
/// sidecar unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl RecordDate {
    pub fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Strict sidecar parse: exactly `YYYY-MM-DD`, all digits, nothing
    /// before or after.
    pub fn parse(s: &str) -> Result<Self, MetadataError> {
        let bad = || MetadataError::BadDate(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(bad());
        }
        let digits = |r: std::ops::Range<usize>| -> Result<&str, MetadataError> {
            let part = &s[r];
            if part.bytes().all(|b| b.is_ascii_digit()) {
                Ok(part)
            } else {
                Err(bad())
            }
        };
        Ok(Self {
            year: digits(0..4)?.parse().map_err(|_| bad())?,
            month: digits(5..7)?.parse().map_err(|_| bad())?,
            day: digits(8..10)?.parse().map_err(|_| bad())?,
        })
    }

    /// Reduce candidate dates by minimizing each component independently:
    /// the result's year is the minimum year across all candidates, and
    /// likewise for month and for day.
    ///
    /// This means two candidates can combine into a date neither of them
    /// contains — `2020-05-10` and `2019-11-25` reduce to `2019-05-10`.
    /// Almost certainly not what anyone intended, but every archive
    /// written so far carries dates computed this way, and recomputing
    /// them differently would silently disagree with what is on disk.
    pub fn component_min(candidates: &[RecordDate]) -> Option<RecordDate> {
        candidates.iter().copied().reduce(|a, b| RecordDate {
            year: a.year.min(b.year),
            month: a.month.min(b.month),
            day: a.day.min(b.day),
        })
    }
}

impl fmt::Display for RecordDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// The per-object attribute set.
///
/// `hash`, `object_path` and `meta_path` are derived from the content
/// hash and the store layout — they are recomputed on every load and
/// never persisted.
#[derive(Debug, Clone)]
pub struct MetadataRecord {
    pub hash: ContentHash,
    pub object_path: PathBuf,
    pub meta_path: PathBuf,
    pub date: Option<RecordDate>,
    fields: BTreeMap<String, Value>,
}

/// Key of the original-base-name attribute used to name secondary links.
pub const FILENAME_KEY: &str = "filename";

/// Key of the free-text label attribute indexed under `by_tag/`.
pub const TAG_KEY: &str = "tag";

const DATE_KEY: &str = "date";

impl MetadataRecord {
    /// Load the record for a hash.
    ///
    /// Derives the canonical and sidecar paths from the store layout. A
    /// missing sidecar yields a record with only derived fields; an
    /// existing one is parsed line by line with field promotion.
    pub fn load(store: &Store, hash: ContentHash) -> Result<Self, MetadataError> {
        let (object_path, meta_path) = store.paths_for(&hash, false)?;
        let mut record = Self {
            hash,
            object_path,
            meta_path,
            date: None,
            fields: BTreeMap::new(),
        };

        if !record.meta_path.exists() {
            return Ok(record);
        }

        let content = std::fs::read_to_string(&record.meta_path)?;
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = split_line(line)?;
            if key == DATE_KEY {
                if record.date.is_some() {
                    return Err(MetadataError::DuplicateDate);
                }
                record.date = Some(RecordDate::parse(value)?);
            } else {
                record.push(&key, value);
            }
        }
        Ok(record)
    }

    /// Add a value for a key, promoting scalar to list on the second
    /// occurrence.
    pub fn push(&mut self, key: &str, value: &str) {
        match self.fields.entry(key.to_string()) {
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(Value::Scalar(value.to_string()));
            }
            std::collections::btree_map::Entry::Occupied(mut e) => {
                e.get_mut().push(value.to_string());
            }
        }
    }

    /// Overwrite a key with a single scalar value. Used for `filename`,
    /// which must stay singular across re-ingests.
    pub fn set(&mut self, key: &str, value: &str) {
        self.fields
            .insert(key.to_string(), Value::Scalar(value.to_string()));
    }

    /// Add a value only if the field does not already carry it.
    pub fn push_unless_present(&mut self, key: &str, value: &str) {
        if !self.get(key).is_some_and(|v| v.iter().any(|x| x == value)) {
            self.push(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The original base name of the ingested file. When a hand-edited
    /// sidecar carries several, the last one wins.
    pub fn filename(&self) -> Option<&str> {
        self.fields.get(FILENAME_KEY).map(Value::last)
    }

    /// All tags in insertion order (empty if none).
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.fields.get(TAG_KEY).into_iter().flat_map(Value::iter)
    }

    /// Derive the date from extractor candidates, only if absent.
    ///
    /// A record that already has a date keeps it — embedded timestamps
    /// are never consulted again once a date is stored.
    pub fn merge_date(&mut self, candidates: &[RecordDate]) {
        if self.date.is_none() {
            self.date = RecordDate::component_min(candidates);
        }
    }

    /// Serialize every non-derived field to the sidecar.
    ///
    /// Keys are written sorted, list fields as one line per element in
    /// list order. A failed write leaves the canonical object untouched.
    pub fn save(&self) -> Result<(), MetadataError> {
        let mut out = String::new();
        let mut pending_date = self.date;
        for (key, value) in &self.fields {
            if let Some(date) = pending_date
                && key.as_str() > DATE_KEY
            {
                out.push_str(&format!("{DATE_KEY}: {date}\n"));
                pending_date = None;
            }
            let escaped = escape_key(key);
            for v in value.iter() {
                out.push_str(&format!("{escaped}: {v}\n"));
            }
        }
        if let Some(date) = pending_date {
            out.push_str(&format!("{DATE_KEY}: {date}\n"));
        }
        std::fs::write(&self.meta_path, out)?;
        Ok(())
    }
}

/// Split a sidecar line at the first unescaped colon.
///
/// The key side is trimmed of surrounding whitespace and `\:` unescaped;
/// the value keeps everything after the separator minus leading
/// whitespace (trailing whitespace is data).
fn split_line(line: &str) -> Result<(String, &str), MetadataError> {
    let bytes = line.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] == b':' && (i == 0 || bytes[i - 1] != b'\\') {
            let key = line[..i].trim().replace("\\:", ":");
            return Ok((key, line[i + 1..].trim_start()));
        }
    }
    Err(MetadataError::BadLine(line.to_string()))
}

fn escape_key(key: &str) -> String {
    key.replace(':', "\\:")
}
