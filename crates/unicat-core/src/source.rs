use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{CatalogError, Result};
use crate::marc::iso2709;

/// Extensions accepted as ISO 2709 input.
pub const INPUT_EXTENSIONS: &[&str] = &["mrc", "marc", "dat", "iso2709"];

/// One input catalog: a short source label plus the file it is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub label: String,
    pub path: PathBuf,
}

impl SourceSpec {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// Parse `LABEL=path`. Splits on the first `=`; both sides are trimmed and
    /// must be non-empty.
    pub fn parse(arg: &str) -> Result<Self> {
        let (label, path) = arg
            .split_once('=')
            .ok_or_else(|| CatalogError::InvalidSource(arg.to_string()))?;
        let (label, path) = (label.trim(), path.trim());
        if label.is_empty() || path.is_empty() {
            return Err(CatalogError::InvalidSource(arg.to_string()));
        }
        Ok(Self::new(label, path))
    }

    pub fn is_supported_format(&self) -> bool {
        has_input_extension(&self.path)
    }

    /// Open the file as a streaming record reader.
    pub fn open(&self) -> Result<iso2709::Reader<BufReader<File>>> {
        if !self.is_supported_format() {
            return Err(CatalogError::UnsupportedFormat {
                label: self.label.clone(),
                path: self.path.clone(),
            });
        }
        if !self.path.is_file() {
            return Err(CatalogError::SourceNotFound {
                label: self.label.clone(),
                path: self.path.clone(),
            });
        }
        let file = File::open(&self.path)?;
        Ok(iso2709::Reader::new(BufReader::new(file)))
    }
}

impl FromStr for SourceSpec {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.label, self.path.display())
    }
}

pub fn has_input_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| INPUT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_label_and_path() {
        let spec = SourceSpec::parse("LIB1=data/lib1.mrc").unwrap();
        assert_eq!(spec.label, "LIB1");
        assert_eq!(spec.path, PathBuf::from("data/lib1.mrc"));
    }

    #[test]
    fn splits_on_first_equals_and_trims() {
        let spec = SourceSpec::parse(" LIB2 = dir/a=b.mrc ").unwrap();
        assert_eq!(spec.label, "LIB2");
        assert_eq!(spec.path, PathBuf::from("dir/a=b.mrc"));
    }

    #[test]
    fn rejects_malformed_arguments() {
        for arg in ["lib1.mrc", "=lib1.mrc", "LIB1=", "  =  "] {
            assert!(
                matches!(SourceSpec::parse(arg), Err(CatalogError::InvalidSource(_))),
                "{arg} should be rejected"
            );
        }
    }

    #[test]
    fn extensions_are_case_insensitive() {
        assert!(SourceSpec::new("A", "x.MRC").is_supported_format());
        assert!(SourceSpec::new("A", "x.iso2709").is_supported_format());
        assert!(!SourceSpec::new("A", "x.xml").is_supported_format());
        assert!(!SourceSpec::new("A", "noext").is_supported_format());
    }

    #[test]
    fn open_rejects_xml_with_conversion_hint() {
        let err = SourceSpec::new("LIB1", "catalog.xml").open().unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, CatalogError::UnsupportedFormat { .. }));
        assert!(msg.contains("LIB1"));
        assert!(msg.contains("catalog.xml"));
        assert!(msg.contains("yaz-marcdump"));
    }

    #[test]
    fn open_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let spec = SourceSpec::new("LIB1", dir.path().join("missing.mrc"));
        assert!(matches!(spec.open(), Err(CatalogError::SourceNotFound { .. })));
    }
}
