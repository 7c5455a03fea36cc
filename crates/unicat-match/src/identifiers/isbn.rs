use serde::Serialize;

use crate::error::{Result, UnionError};
use crate::normalize::digits_and_x;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Isbn {
    pub raw: String,
    /// Digits and `X` only, as used in strong keys.
    pub normalized: String,
}

fn digit_values(s: &str) -> Option<Vec<u32>> {
    s.chars().map(|c| c.to_digit(10)).collect()
}

/// `Σ (i+1)·dᵢ` over the first nine digits, mod 11, must equal the tenth
/// character (`X` standing for 10).
pub fn is_valid_isbn10(d: &str) -> bool {
    if d.len() != 10 || !d.is_ascii() {
        return false;
    }
    let Some(digits) = digit_values(&d[..9]) else {
        return false;
    };
    let sum: u32 = digits.iter().enumerate().map(|(i, &v)| (i as u32 + 1) * v).sum();
    let check = sum % 11;
    match d.as_bytes()[9] {
        b'X' => check == 10,
        b => b.is_ascii_digit() && u32::from(b - b'0') == check,
    }
}

/// Weights alternate 1,3 over the first twelve digits; the check digit is
/// `(10 - sum % 10) % 10`.
pub fn is_valid_isbn13(d: &str) -> bool {
    if d.len() != 13 {
        return false;
    }
    let Some(digits) = digit_values(d) else {
        return false;
    };
    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, &v)| if i % 2 == 0 { v } else { v * 3 })
        .sum();
    (10 - sum % 10) % 10 == digits[12]
}

/// Reduce to digits/`X` and accept 10- or 13-character candidates. With
/// `checksums` off, length alone decides.
pub fn normalize_isbn(input: &str, checksums: bool) -> Option<String> {
    let d = digits_and_x(input);
    let valid = match d.len() {
        10 => !checksums || is_valid_isbn10(&d),
        13 => !checksums || is_valid_isbn13(&d),
        _ => false,
    };
    valid.then_some(d)
}

fn isbn10_to_isbn13(isbn10: &str) -> Option<String> {
    let digits = digit_values(&isbn10[..9])?;
    let mut d13: Vec<u32> = vec![9, 7, 8];
    d13.extend(digits);
    let sum: u32 = d13
        .iter()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    d13.push((10 - (sum % 10)) % 10);
    Some(d13.iter().map(|d| d.to_string()).collect())
}

impl Isbn {
    pub fn parse(input: &str, checksums: bool) -> Result<Self> {
        let normalized =
            normalize_isbn(input, checksums).ok_or_else(|| UnionError::InvalidIsbn(input.to_string()))?;
        Ok(Self {
            raw: input.to_string(),
            normalized,
        })
    }

    /// The 13-digit form, when one can be derived.
    pub fn isbn13(&self) -> Option<String> {
        match self.normalized.len() {
            13 if self.normalized.bytes().all(|b| b.is_ascii_digit()) => Some(self.normalized.clone()),
            10 => isbn10_to_isbn13(&self.normalized),
            _ => None,
        }
    }
}
