use serde::Serialize;

use crate::error::{Result, UnionError};
use crate::normalize::digits_and_x;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Issn {
    pub raw: String,
    pub normalized: String,
}

/// Seven-character input is left-padded with `0` before checking. Weights
/// run 8 down to 2 over the first seven digits; `(11 - sum % 11) % 11` is
/// the check value, written `X` when it is 10.
pub fn is_valid_issn(d: &str) -> bool {
    let padded = if d.len() == 7 { format!("0{d}") } else { d.to_string() };
    if padded.len() != 8 || !padded.is_ascii() {
        return false;
    }

    let mut sum = 0u32;
    for (i, c) in padded[..7].chars().enumerate() {
        let Some(v) = c.to_digit(10) else {
            return false;
        };
        sum += (8 - i as u32) * v;
    }
    let check = (11 - sum % 11) % 11;
    match padded.as_bytes()[7] {
        b'X' => check == 10,
        b => b.is_ascii_digit() && u32::from(b - b'0') == check,
    }
}

/// Digits/`X` form of an ISSN candidate, unpadded. Without checksums any
/// seven- or eight-character candidate passes.
pub fn normalize_issn(input: &str, checksums: bool) -> Option<String> {
    let d = digits_and_x(input);
    if d.is_empty() {
        return None;
    }
    let valid = if checksums {
        is_valid_issn(&d)
    } else {
        matches!(d.len(), 7 | 8)
    };
    valid.then_some(d)
}

impl Issn {
    pub fn parse(input: &str, checksums: bool) -> Result<Self> {
        let normalized =
            normalize_issn(input, checksums).ok_or_else(|| UnionError::InvalidIssn(input.to_string()))?;
        Ok(Self {
            raw: input.to_string(),
            normalized,
        })
    }

    /// `NNNN-NNNC` display form.
    pub fn hyphenated(&self) -> String {
        let padded = format!("{:0>8}", self.normalized);
        format!("{}-{}", &padded[..4], &padded[4..])
    }
}
