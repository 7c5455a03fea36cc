//! MARC21-slim XML output. Each `<record>` is rendered by `marctk`; this
//! writer only supplies the enclosing `<collection>`.

use std::io::Write;

use super::{Record, Result};

pub const MARC_NAMESPACE: &str = "http://www.loc.gov/MARC21/slim";

/// Writes a `<collection>` document; call [`Writer::finish`] to close it.
pub struct Writer<W: Write> {
    inner: W,
}

impl<W: Write> Writer<W> {
    pub fn new(mut inner: W) -> Result<Self> {
        writeln!(inner, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(inner, "<collection xmlns=\"{MARC_NAMESPACE}\">")?;
        Ok(Self { inner })
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let xml = record.to_marctk()?.to_xml_string();
        writeln!(self.inner, "{}", strip_declaration(&xml).trim())?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        writeln!(self.inner, "</collection>")?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Standalone record documents may open with their own XML declaration.
fn strip_declaration(xml: &str) -> &str {
    let xml = xml.trim_start();
    if xml.starts_with("<?xml") {
        if let Some(end) = xml.find("?>") {
            return &xml[end + 2..];
        }
    }
    xml
}
