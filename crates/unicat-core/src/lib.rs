pub mod collection;
pub mod config;
pub mod error;
pub mod marc;
pub mod source;

pub use collection::{CollectionWriter, OutputFormat};
pub use config::{MatchingConfig, MergeConfig, UnionConfig};
pub use error::{CatalogError, Result};
pub use marc::{ControlField, DataField, Field, MarcError, Record, Subfield};
pub use source::SourceSpec;
