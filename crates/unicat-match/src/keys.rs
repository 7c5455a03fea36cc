//! Identity keys: the exact ISBN/ISSN key and the approximate
//! author/title/year key, plus the per-record local identifier.

use unicat_core::{MatchingConfig, Record};

use crate::identifiers::{normalize_isbn, normalize_issn};
use crate::normalize::normalize_text;

const AUTHOR_TAGS: [&str; 3] = ["100", "110", "111"];
const AUTHOR_CODES: [char; 4] = ['a', 'b', 'c', 'd'];
const TITLE_CODES: [char; 2] = ['a', 'b'];
const DATE_TAGS: [&str; 2] = ["264", "260"];
const ISBN_CODES: [char; 2] = ['a', 'z'];
const ISSN_CODES: [char; 3] = ['a', 'y', 'z'];

/// Keys computed once per input record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordKeys {
    pub strong: Option<String>,
    /// `None` when fuzzy extraction is off or the normalized key is empty.
    pub fuzzy: Option<String>,
}

/// Extraction settings threaded from [`MatchingConfig`].
#[derive(Debug, Clone, Copy)]
pub struct KeyExtractor {
    checksums: bool,
    fuzzy: bool,
}

impl KeyExtractor {
    pub fn new(matching: &MatchingConfig) -> Self {
        Self {
            checksums: matching.checksums,
            fuzzy: matching.fuzzy,
        }
    }

    pub fn extract(&self, record: &Record) -> RecordKeys {
        let fuzzy = if self.fuzzy {
            Some(fuzzy_key(record)).filter(|k| !k.is_empty())
        } else {
            None
        };
        RecordKeys {
            strong: strong_key(record, self.checksums),
            fuzzy,
        }
    }
}

/// First acceptable ISBN in `020 $a $z`, else first acceptable ISSN in
/// `022 $a $y $z`, as `ISBN:<d>` / `ISSN:<d>`.
pub fn strong_key(record: &Record, checksums: bool) -> Option<String> {
    let isbn = record
        .data_fields("020")
        .flat_map(|f| f.subfield_values(&ISBN_CODES))
        .find_map(|v| normalize_isbn(v, checksums));
    if let Some(d) = isbn {
        return Some(format!("ISBN:{d}"));
    }

    record
        .data_fields("022")
        .flat_map(|f| f.subfield_values(&ISSN_CODES))
        .find_map(|v| normalize_issn(v, checksums))
        .map(|d| format!("ISSN:{d}"))
}

pub fn fuzzy_key(record: &Record) -> String {
    normalize_text(&format!(
        "{}|{}|{}",
        author(record),
        title(record),
        year(record)
    ))
}

/// Name parts of the first main-entry heading present (100, then 110, then 111).
pub fn author(record: &Record) -> String {
    AUTHOR_TAGS
        .iter()
        .find_map(|tag| record.data_fields(tag).next())
        .map(|f| f.subfield_values(&AUTHOR_CODES).collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

pub fn title(record: &Record) -> String {
    record
        .data_fields("245")
        .next()
        .map(|f| f.subfield_values(&TITLE_CODES).collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

/// Publication year: the first `264 $c` / `260 $c` value holding at least
/// four digits gives its first four digits; otherwise `008/07-10` when numeric.
pub fn year(record: &Record) -> String {
    for tag in DATE_TAGS {
        for field in record.data_fields(tag) {
            for value in field.subfield_values(&['c']) {
                let digits: String = value.chars().filter(char::is_ascii_digit).collect();
                if digits.len() >= 4 {
                    return digits[..4].to_string();
                }
            }
        }
    }

    match record.control_value("008") {
        Some(fixed) if fixed.chars().count() >= 11 => {
            let y: String = fixed.chars().skip(7).take(4).collect();
            if y.chars().all(|c| c.is_ascii_digit()) {
                y
            } else {
                String::new()
            }
        }
        _ => String::new(),
    }
}

/// `999 $c` of the first 999 field, else `001`, trimmed; empty when neither exists.
pub fn local_id(record: &Record) -> String {
    if let Some(c) = record.data_fields("999").next().and_then(|f| f.first_subfield('c')) {
        return c.trim().to_string();
    }
    record
        .control_value("001")
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}
