//! Embedded timestamp extraction from JPEG and TIFF files.
//!
//! Photographs carry their capture date inside the file: EXIF date tags
//! and IPTC Record 2 date datasets. This module reads a fixed, ordered
//! set of them:
//!
//! 1. EXIF DateTimeOriginal (tag 0x9003, Exif sub-IFD)
//! 2. EXIF DateTimeDigitized (tag 0x9004, Exif sub-IFD)
//! 3. EXIF DateTime (tag 0x0132, IFD0)
//! 4. IPTC DateCreated (record 2, dataset 55)
//! 5. IPTC DigitalCreationDate (record 2, dataset 62)
//!
//! For JPEG: EXIF lives in the APP1 marker (a TIFF structure behind an
//! `Exif\0\0` header) and IPTC in APP13 (Photoshop 8BIM resource 0x0404).
//! For TIFF: EXIF tags come from the IFD chain, IPTC from IFD tag 33723
//! (raw IIM bytes) or 34377 (Photoshop resource block).
//!
//! Each present field value is matched against a loose year-month-day
//! pattern; a value that does not match is reported as a non-fatal
//! warning naming the raw value, and the field is skipped. Unsupported
//! file types yield no candidates. Only a missing or unreadable file is
//! an error.
//!
//! Zero external dependencies — pure Rust segment and IFD walking.

use crate::record::RecordDate;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A recognized timestamp field whose value did not look like a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWarning {
    /// Name of the embedded field (e.g. `DateTimeOriginal`).
    pub field: &'static str,
    /// The raw value as found in the file.
    pub raw: String,
}

impl std::fmt::Display for DateWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unparseable {} value {:?}", self.field, self.raw)
    }
}

/// Result of scanning one file's embedded metadata.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Candidate dates, in recognized-field order.
    pub candidates: Vec<RecordDate>,
    /// One warning per present-but-unparseable field value.
    pub warnings: Vec<DateWarning>,
}

/// Where candidate capture dates come from.
///
/// The ingestion pipeline only needs "zero or more (year, month, day)
/// triples per file"; tests substitute a scripted source.
pub trait DateSource {
    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError>;
}

/// Production [`DateSource`]: reads the file's own EXIF/IPTC metadata.
#[derive(Debug, Default)]
pub struct EmbeddedDates;

impl DateSource for EmbeddedDates {
    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let bytes = std::fs::read(path).map_err(|source| ExtractError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let raw = match ext.as_str() {
            "jpg" | "jpeg" => raw_dates_from_jpeg(&bytes),
            "tif" | "tiff" => raw_dates_from_tiff(&bytes),
            _ => RawDates::default(),
        };
        Ok(raw.into_extraction())
    }
}

// ---------------------------------------------------------------------------
// Recognized fields and the loose date pattern
// ---------------------------------------------------------------------------

/// Raw values of the recognized timestamp fields, before date parsing.
#[derive(Debug, Default)]
struct RawDates {
    date_time_original: Option<String>,
    date_time_digitized: Option<String>,
    date_time: Option<String>,
    date_created: Option<String>,
    digital_creation_date: Option<String>,
}

impl RawDates {
    /// Parse every present field in the fixed recognized order; matches
    /// become candidates, mismatches become warnings.
    fn into_extraction(self) -> Extraction {
        let fields = [
            ("DateTimeOriginal", self.date_time_original),
            ("DateTimeDigitized", self.date_time_digitized),
            ("DateTime", self.date_time),
            ("DateCreated", self.date_created),
            ("DigitalCreationDate", self.digital_creation_date),
        ];

        let mut result = Extraction::default();
        for (field, value) in fields {
            let Some(raw) = value else { continue };
            match parse_loose_date(&raw) {
                Some(date) => result.candidates.push(date),
                None => result.warnings.push(DateWarning { field, raw }),
            }
        }
        result
    }
}

/// Match a loose year-month-day pattern: four digits, an optional single
/// non-digit separator, two digits, another optional separator, two
/// digits. Anything after the day (a time of day, usually) is ignored.
///
/// Accepts the shapes cameras actually write: `2021:06:01 10:00:00`
/// (EXIF), `20210601` (IPTC), `2021-06-01`.
fn parse_loose_date(raw: &str) -> Option<RecordDate> {
    let bytes = raw.trim().as_bytes();
    let mut pos = 0;

    let year = take_digits(bytes, &mut pos, 4)?;
    skip_separator(bytes, &mut pos);
    let month = take_digits(bytes, &mut pos, 2)?;
    skip_separator(bytes, &mut pos);
    let day = take_digits(bytes, &mut pos, 2)?;
    Some(RecordDate::new(year, month as u8, day as u8))
}

fn take_digits(bytes: &[u8], pos: &mut usize, count: usize) -> Option<u16> {
    let part = bytes.get(*pos..*pos + count)?;
    if !part.iter().all(u8::is_ascii_digit) {
        return None;
    }
    *pos += count;
    // Digits only, at most 4 of them — cannot overflow u16
    Some(part.iter().fold(0u16, |n, b| n * 10 + u16::from(b - b'0')))
}

fn skip_separator(bytes: &[u8], pos: &mut usize) {
    if bytes.get(*pos).is_some_and(|b| !b.is_ascii_digit()) {
        *pos += 1;
    }
}

// ---------------------------------------------------------------------------
// IPTC-IIM record parsing
// ---------------------------------------------------------------------------

/// Walk raw IPTC-IIM bytes for Record 2 date datasets.
///
/// IIM dataset format:
///   Byte 0:    0x1C (tag marker)
///   Byte 1:    Record number (we want 0x02)
///   Byte 2:    Dataset number (55 = DateCreated, 62 = DigitalCreationDate)
///   Bytes 3-4: Data length (big-endian u16)
///   Bytes 5+:  Data (UTF-8/ASCII string)
fn scan_iptc_iim(data: &[u8], raw: &mut RawDates) {
    let mut pos = 0;

    while pos + 5 <= data.len() {
        if data[pos] != 0x1C {
            pos += 1;
            continue;
        }

        let record = data[pos + 1];
        let dataset = data[pos + 2];
        let length = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as usize;
        pos += 5;

        if pos + length > data.len() {
            break;
        }

        if record == 2 {
            let value = String::from_utf8_lossy(&data[pos..pos + length])
                .trim()
                .to_string();

            if !value.is_empty() {
                match dataset {
                    55 => raw.date_created = Some(value),
                    62 => raw.digital_creation_date = Some(value),
                    _ => {}
                }
            }
        }

        pos += length;
    }
}

// ---------------------------------------------------------------------------
// JPEG: APP1 (Exif) and APP13 (Photoshop 8BIM / IPTC) segments
// ---------------------------------------------------------------------------

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const BIM_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;

/// Scan JPEG markers for the first Exif APP1 and the first IPTC-bearing
/// APP13 segment.
fn raw_dates_from_jpeg(data: &[u8]) -> RawDates {
    let mut raw = RawDates::default();
    let mut pos = 0;

    while pos + 4 < data.len() {
        if data[pos] == 0xFF && pos + 3 < data.len() && data[pos + 1] != 0x00 {
            let marker = data[pos + 1];
            // SOS means image data starts — stop scanning
            if marker == 0xDA {
                break;
            }
            // Markers without a length field
            if marker == 0xD8 || marker == 0xD9 || (0xD0..=0xD7).contains(&marker) {
                pos += 2;
                continue;
            }

            let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            let seg_start = pos + 4;
            let seg_end = (pos + 2 + seg_len).min(data.len());
            let segment = &data[seg_start..seg_end.max(seg_start)];

            match marker {
                // APP1: Exif data is a TIFF structure behind a fixed header
                0xE1 if segment.starts_with(EXIF_HEADER) => {
                    scan_tiff(&segment[EXIF_HEADER.len()..], &mut raw);
                }
                // APP13: Photoshop resource block carrying IPTC-IIM
                0xED => {
                    if let Some(iptc) = extract_iptc_from_8bim(segment) {
                        scan_iptc_iim(iptc, &mut raw);
                    }
                }
                _ => {}
            }
            pos += 2 + seg_len;
        } else {
            pos += 1;
        }
    }
    raw
}

/// Extract IPTC-IIM bytes from a Photoshop 8BIM resource block.
fn extract_iptc_from_8bim(segment: &[u8]) -> Option<&[u8]> {
    let data = if segment.starts_with(PHOTOSHOP_HEADER) {
        &segment[PHOTOSHOP_HEADER.len()..]
    } else {
        segment
    };

    let mut pos = 0;
    while pos + 12 <= data.len() {
        // Each resource: "8BIM" (4) + resource_id (2) + pascal_string + data_len (4) + data
        if &data[pos..pos + 4] != BIM_MARKER {
            pos += 1;
            continue;
        }
        pos += 4;

        if pos + 2 > data.len() {
            break;
        }
        let resource_id = u16::from_be_bytes([data[pos], data[pos + 1]]);
        pos += 2;

        // Pascal string: 1 byte length + string, padded to even total
        if pos >= data.len() {
            break;
        }
        let pascal_len = data[pos] as usize;
        pos += 1 + pascal_len + ((1 + pascal_len) % 2);

        if pos + 4 > data.len() {
            break;
        }
        let res_len =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        pos += 4;

        if pos + res_len > data.len() {
            break;
        }

        if resource_id == IPTC_RESOURCE_ID {
            return Some(&data[pos..pos + res_len]);
        }

        pos += res_len + (res_len % 2);
    }

    None
}

// ---------------------------------------------------------------------------
// TIFF: EXIF date tags and IPTC from the IFD chain
// ---------------------------------------------------------------------------

const TAG_DATE_TIME: u16 = 0x0132;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TAG_DATE_TIME_DIGITIZED: u16 = 0x9004;
const TAG_IPTC_NAA: u16 = 33723;
const TAG_PHOTOSHOP: u16 = 34377;

fn raw_dates_from_tiff(data: &[u8]) -> RawDates {
    let mut raw = RawDates::default();
    scan_tiff(data, &mut raw);
    raw
}

/// Walk a TIFF structure (a standalone file or the payload of a JPEG
/// Exif segment) for date tags and embedded IPTC.
fn scan_tiff(data: &[u8], raw: &mut RawDates) {
    if data.len() < 8 {
        return;
    }

    let big_endian = match &data[0..2] {
        b"MM" => true,
        b"II" => false,
        _ => return,
    };

    let read_u16 = |offset: usize| -> u16 {
        if big_endian {
            u16::from_be_bytes([data[offset], data[offset + 1]])
        } else {
            u16::from_le_bytes([data[offset], data[offset + 1]])
        }
    };

    let read_u32 = |offset: usize| -> u32 {
        let b = [
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ];
        if big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        }
    };

    // Verify TIFF magic (42)
    if read_u16(2) != 42 {
        return;
    }

    // TIFF type sizes: count is number of values, not bytes.
    let type_size = |typ: u16| -> usize {
        match typ {
            1 | 2 | 6 | 7 => 1, // BYTE, ASCII, SBYTE, UNDEFINED
            3 | 8 => 2,         // SHORT, SSHORT
            4 | 9 | 11 => 4,    // LONG, SLONG, FLOAT
            5 | 10 | 12 => 8,   // RATIONAL, SRATIONAL, DOUBLE
            _ => 1,
        }
    };

    // ASCII tag value: inline in the offset field when it fits 4 bytes,
    // otherwise at the pointed-to offset. Trailing NUL stripped.
    let read_ascii = |entry_offset: usize, byte_len: usize| -> Option<String> {
        let start = if byte_len <= 4 {
            entry_offset + 8
        } else {
            read_u32(entry_offset + 8) as usize
        };
        let bytes = data.get(start..start + byte_len)?;
        let text = String::from_utf8_lossy(bytes)
            .trim_end_matches('\0')
            .trim()
            .to_string();
        (!text.is_empty()).then_some(text)
    };

    // Walk one IFD's entries; returns the Exif sub-IFD offset if seen.
    let scan_ifd = |ifd_offset: usize, raw: &mut RawDates| -> Option<usize> {
        if ifd_offset + 2 > data.len() {
            return None;
        }
        let entry_count = read_u16(ifd_offset) as usize;
        let entries_start = ifd_offset + 2;
        let mut exif_ifd = None;

        for i in 0..entry_count {
            let entry_offset = entries_start + i * 12;
            if entry_offset + 12 > data.len() {
                break;
            }

            let tag = read_u16(entry_offset);
            let typ = read_u16(entry_offset + 2);
            let count = read_u32(entry_offset + 4) as usize;
            let byte_len = count * type_size(typ);
            let value_offset = read_u32(entry_offset + 8) as usize;

            match tag {
                TAG_DATE_TIME if raw.date_time.is_none() => {
                    raw.date_time = read_ascii(entry_offset, byte_len);
                }
                TAG_DATE_TIME_ORIGINAL if raw.date_time_original.is_none() => {
                    raw.date_time_original = read_ascii(entry_offset, byte_len);
                }
                TAG_DATE_TIME_DIGITIZED if raw.date_time_digitized.is_none() => {
                    raw.date_time_digitized = read_ascii(entry_offset, byte_len);
                }
                TAG_EXIF_IFD => {
                    exif_ifd = Some(value_offset);
                }
                TAG_IPTC_NAA if value_offset + byte_len <= data.len() => {
                    scan_iptc_iim(&data[value_offset..value_offset + byte_len], raw);
                }
                TAG_PHOTOSHOP if value_offset + byte_len <= data.len() => {
                    if let Some(iptc) =
                        extract_iptc_from_8bim(&data[value_offset..value_offset + byte_len])
                    {
                        scan_iptc_iim(iptc, raw);
                    }
                }
                _ => {}
            }
        }
        exif_ifd
    };

    // Walk the main IFD chain, plus any Exif sub-IFD it points at.
    let mut ifd_offset = read_u32(4) as usize;
    while ifd_offset > 0 && ifd_offset + 2 < data.len() {
        if let Some(exif_ifd) = scan_ifd(ifd_offset, &mut *raw) {
            scan_ifd(exif_ifd, &mut *raw);
        }

        let entry_count = read_u16(ifd_offset) as usize;
        let next_offset_pos = ifd_offset + 2 + entry_count * 12;
        if next_offset_pos + 4 <= data.len() {
            ifd_offset = read_u32(next_offset_pos) as usize;
        } else {
            break;
        }
    }
}
