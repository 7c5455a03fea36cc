//! Bibliographic record model (MARC 21 shaped) and its codecs.
//!
//! A [`Record`] is an ordered list of tagged fields. Fields tagged `001`–`009`
//! are control fields carrying a single value; every other tag is a data field
//! with two indicators and an ordered list of subfields. The same tag may occur
//! any number of times.
//!
//! Serialization goes through `marctk`; this module only converts between its
//! record type and the typed view the matcher works on.

pub mod iso2709;
pub mod marcxml;

use thiserror::Error;

/// Blank indicator value.
pub const BLANK: char = ' ';

/// Leader used for records built from scratch.
pub const DEFAULT_LEADER: &str = "00000nam a2200000 a 4500";

#[derive(Debug, Error)]
pub enum MarcError {
    #[error("invalid leader: {0}")]
    Leader(String),

    #[error("record truncated: {0}")]
    Truncated(String),

    #[error("invalid record: {0}")]
    Codec(String),

    #[error("field {tag} is {len} bytes long, ISO 2709 allows {max}")]
    FieldTooLong { tag: String, len: usize, max: usize },

    #[error("record is {len} bytes long, ISO 2709 allows {max}")]
    RecordTooLong { len: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MarcError {
    /// Decode failures affect one record only; I/O failures end the stream.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MarcError::Io(_))
    }

    /// The record cannot be expressed in ISO 2709 at all.
    pub fn is_oversized(&self) -> bool {
        matches!(self, MarcError::FieldTooLong { .. } | MarcError::RecordTooLong { .. })
    }
}

fn codec<T, E: std::fmt::Display>(result: std::result::Result<T, E>) -> Result<T> {
    result.map_err(|e| MarcError::Codec(e.to_string()))
}

pub type Result<T> = std::result::Result<T, MarcError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    pub code: char,
    pub value: String,
}

impl Subfield {
    pub fn new(code: char, value: impl Into<String>) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlField {
    pub tag: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataField {
    pub tag: String,
    pub ind1: char,
    pub ind2: char,
    pub subfields: Vec<Subfield>,
}

impl DataField {
    pub fn new(tag: impl Into<String>, ind1: char, ind2: char) -> Self {
        Self {
            tag: tag.into(),
            ind1,
            ind2,
            subfields: Vec::new(),
        }
    }

    pub fn with_subfield(mut self, code: char, value: impl Into<String>) -> Self {
        self.subfields.push(Subfield::new(code, value));
        self
    }

    /// Values of the subfields whose code is in `codes`, in field order.
    pub fn subfield_values<'a>(&'a self, codes: &'a [char]) -> impl Iterator<Item = &'a str> + 'a {
        self.subfields
            .iter()
            .filter(move |sf| codes.contains(&sf.code))
            .map(|sf| sf.value.as_str())
    }

    pub fn first_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Control(ControlField),
    Data(DataField),
}

impl Field {
    pub fn control(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Field::Control(ControlField {
            tag: tag.into(),
            value: value.into(),
        })
    }

    pub fn tag(&self) -> &str {
        match self {
            Field::Control(f) => &f.tag,
            Field::Data(f) => &f.tag,
        }
    }

    pub fn as_data(&self) -> Option<&DataField> {
        match self {
            Field::Data(f) => Some(f),
            Field::Control(_) => None,
        }
    }

    pub fn as_control(&self) -> Option<&ControlField> {
        match self {
            Field::Control(f) => Some(f),
            Field::Data(_) => None,
        }
    }
}

impl From<DataField> for Field {
    fn from(field: DataField) -> Self {
        Field::Data(field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub leader: String,
    pub fields: Vec<Field>,
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl Record {
    pub fn new() -> Self {
        Self {
            leader: DEFAULT_LEADER.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<Field>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn push_field(&mut self, field: impl Into<Field>) {
        self.fields.push(field.into());
    }

    /// Removes every field with `tag`; returns how many were dropped.
    pub fn remove_tag(&mut self, tag: &str) -> usize {
        let before = self.fields.len();
        self.fields.retain(|f| f.tag() != tag);
        before - self.fields.len()
    }

    pub fn fields_with_tag<'a, 't>(&'a self, tag: &'t str) -> impl Iterator<Item = &'a Field> + use<'a, 't> {
        self.fields.iter().filter(move |f| f.tag() == tag)
    }

    pub fn data_fields<'a, 't>(&'a self, tag: &'t str) -> impl Iterator<Item = &'a DataField> + use<'a, 't> {
        self.fields_with_tag(tag).filter_map(Field::as_data)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.fields.iter().any(|f| f.tag() == tag)
    }

    /// Value of the first control field with `tag`.
    pub fn control_value<'a>(&'a self, tag: &str) -> Option<&'a str> {
        self.fields_with_tag(tag)
            .find_map(Field::as_control)
            .map(|f| f.value.as_str())
    }

    pub fn from_marctk(source: &marctk::Record) -> Self {
        let mut record = Self {
            leader: source.leader().to_string(),
            fields: Vec::with_capacity(source.control_fields().len() + source.fields().len()),
        };
        for cf in source.control_fields().iter() {
            record.push_field(Field::control(cf.tag(), cf.content()));
        }
        for df in source.fields().iter() {
            let indicator = |ind: &str| ind.chars().next().unwrap_or(BLANK);
            let mut field = DataField::new(df.tag(), indicator(df.ind1()), indicator(df.ind2()));
            for sf in df.subfields().iter() {
                if let Some(code) = sf.code().chars().next() {
                    field.subfields.push(Subfield::new(code, sf.content()));
                }
            }
            record.push_field(field);
        }
        record
    }

    /// Builds the `marctk` record; an unusable leader is replaced by
    /// [`DEFAULT_LEADER`]. Control fields precede data fields in the result.
    pub fn to_marctk(&self) -> Result<marctk::Record> {
        let mut out = marctk::Record::new();
        let leader = if self.leader.len() == 24 && self.leader.is_ascii() {
            self.leader.as_str()
        } else {
            DEFAULT_LEADER
        };
        codec(out.set_leader(leader))?;

        for field in &self.fields {
            match field {
                Field::Control(f) => {
                    out.insert_control_field(codec(marctk::Controlfield::new(f.tag.as_str(), f.value.as_str()))?);
                }
                Field::Data(f) => {
                    let mut data = codec(marctk::Field::new(f.tag.as_str()))?;
                    codec(data.set_ind1(f.ind1.to_string().as_str()))?;
                    codec(data.set_ind2(f.ind2.to_string().as_str()))?;
                    for sf in &f.subfields {
                        codec(data.add_subfield(sf.code.to_string().as_str(), sf.value.as_str()))?;
                    }
                    out.insert_data_field(data);
                }
            }
        }
        Ok(out)
    }
}
