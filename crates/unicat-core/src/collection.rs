use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use crate::error::{CatalogError, Result};
use crate::marc::{self, Record, iso2709, marcxml};
use crate::source::has_input_extension;

/// Serialization of the merged collection, picked from the output extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    MarcXml,
    Iso2709,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let is_xml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        if is_xml {
            Ok(Self::MarcXml)
        } else if has_input_extension(path) {
            Ok(Self::Iso2709)
        } else {
            Err(CatalogError::UnknownOutputFormat(path.to_path_buf()))
        }
    }
}

/// File-backed writer for the merged collection in either format.
pub enum CollectionWriter {
    MarcXml(marcxml::Writer<BufWriter<File>>),
    Iso2709(iso2709::Writer<BufWriter<File>>),
}

impl CollectionWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let format = OutputFormat::from_path(path)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let out = BufWriter::new(File::create(path)?);
        Ok(match format {
            OutputFormat::MarcXml => Self::MarcXml(marcxml::Writer::new(out)?),
            OutputFormat::Iso2709 => Self::Iso2709(iso2709::Writer::new(out)),
        })
    }

    pub fn write_record(&mut self, record: &Record) -> marc::Result<()> {
        match self {
            Self::MarcXml(w) => w.write_record(record),
            Self::Iso2709(w) => w.write_record(record),
        }
    }

    pub fn finish(self) -> marc::Result<()> {
        match self {
            Self::MarcXml(w) => w.finish().map(drop),
            Self::Iso2709(w) => w.finish().map(drop),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marc::{BLANK, DataField, Field};
    use std::io::BufReader;
    use tempfile::TempDir;

    #[test]
    fn format_follows_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("out.xml")).unwrap(), OutputFormat::MarcXml);
        assert_eq!(OutputFormat::from_path(Path::new("out.XML")).unwrap(), OutputFormat::MarcXml);
        assert_eq!(OutputFormat::from_path(Path::new("out.mrc")).unwrap(), OutputFormat::Iso2709);
        assert!(OutputFormat::from_path(Path::new("out.json")).is_err());
    }

    #[test]
    fn iso2709_collection_can_be_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("union.mrc");
        let rec = Record::new()
            .with_field(Field::control("001", "X1"))
            .with_field(DataField::new("948", BLANK, BLANK).with_subfield('a', "note"));

        let mut writer = CollectionWriter::create(&path).unwrap();
        writer.write_record(&rec).unwrap();
        writer.write_record(&rec).unwrap();
        writer.finish().unwrap();

        let reader = iso2709::Reader::new(BufReader::new(File::open(&path).unwrap()));
        let records: Vec<Record> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].control_value("001"), Some("X1"));
    }

    #[test]
    fn xml_collection_is_closed_on_finish() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("union.xml");
        let mut writer = CollectionWriter::create(&path).unwrap();
        writer.write_record(&Record::new()).unwrap();
        writer.finish().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("<record").count(), 1);
        assert!(text.trim_end().ends_with("</collection>"));
    }
}
