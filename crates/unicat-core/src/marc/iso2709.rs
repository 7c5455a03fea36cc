//! ISO 2709 binary interchange format (`.mrc`).
//!
//! The stream is split on the record terminator here so that an I/O failure
//! stays distinguishable from a bad record; each record's bytes are then
//! decoded and encoded by `marctk`. Memory use is bounded by the largest
//! record rather than the file.

use std::io::{BufRead, Write};

use super::{Field, MarcError, Record, Result};

pub const RECORD_TERMINATOR: u8 = 0x1D;

const LEADER_LEN: usize = 24;
const ENTRY_LEN: usize = 12;
pub const MAX_FIELD_LEN: usize = 9_999;
pub const MAX_RECORD_LEN: usize = 99_999;

/// Streaming record reader. Yields one `Result` per record: decode failures
/// are per-record and iteration continues past them; an I/O error is yielded
/// once and ends the stream.
#[derive(Debug)]
pub struct Reader<R> {
    inner: R,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> Reader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(4096),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for Reader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.buf.clear();
        match self.inner.read_until(RECORD_TERMINATOR, &mut self.buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            // Trailing newline or padding after the last record.
            Ok(_) if self.buf.iter().all(u8::is_ascii_whitespace) => {
                self.done = true;
                None
            }
            Ok(_) => Some(decode(&self.buf)),
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

/// Decodes one record, terminator included.
pub fn decode(bytes: &[u8]) -> Result<Record> {
    if bytes.last() != Some(&RECORD_TERMINATOR) {
        return Err(MarcError::Truncated("missing record terminator".to_string()));
    }
    // Some exporters pad records with leading whitespace.
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let bytes = &bytes[start..];

    let leader = bytes
        .get(..LEADER_LEN)
        .ok_or_else(|| MarcError::Leader(format!("{} bytes", bytes.len())))?;
    let numeric = |range: std::ops::Range<usize>| leader[range].iter().all(u8::is_ascii_digit);
    if !numeric(0..5) || !numeric(12..17) {
        return Err(MarcError::Leader(String::from_utf8_lossy(leader).into_owned()));
    }

    let record = marctk::Record::from_binary(bytes).map_err(|e| MarcError::Codec(e.to_string()))?;
    Ok(Record::from_marctk(&record))
}

/// Bytes `field` occupies in the data area, terminator included.
fn encoded_len(field: &Field) -> usize {
    match field {
        Field::Control(f) => f.value.len() + 1,
        Field::Data(f) => {
            let subfields: usize = f
                .subfields
                .iter()
                .map(|sf| 1 + sf.code.len_utf8() + sf.value.len())
                .sum();
            f.ind1.len_utf8() + f.ind2.len_utf8() + subfields + 1
        }
    }
}

/// Rejects records whose fields or total length overflow the directory.
pub fn check_size(record: &Record) -> Result<usize> {
    let mut total = LEADER_LEN + 1 + 1;
    for field in &record.fields {
        let len = encoded_len(field);
        if len > MAX_FIELD_LEN {
            return Err(MarcError::FieldTooLong {
                tag: field.tag().to_string(),
                len,
                max: MAX_FIELD_LEN,
            });
        }
        total += ENTRY_LEN + len;
    }
    if total > MAX_RECORD_LEN {
        return Err(MarcError::RecordTooLong {
            len: total,
            max: MAX_RECORD_LEN,
        });
    }
    Ok(total)
}

/// Encodes one record. Length, base address and directory are computed by
/// the codec; the rest of the leader is kept from the record.
pub fn encode(record: &Record) -> Result<Vec<u8>> {
    check_size(record)?;
    record
        .to_marctk()?
        .to_binary()
        .map_err(|e| MarcError::Codec(e.to_string()))
}

pub struct Writer<W: Write> {
    inner: W,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let bytes = encode(record)?;
        self.inner.write_all(&bytes)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
