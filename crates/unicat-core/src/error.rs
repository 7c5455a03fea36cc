use std::path::PathBuf;

use thiserror::Error;

/// All errors that can occur in unicat-core outside of record decoding.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid source argument '{0}': expected LABEL=path")]
    InvalidSource(String),

    #[error(
        "Source {label}: '{}' is not an ISO 2709 file (.mrc, .marc, .dat, .iso2709). \
         Convert it first, e.g. `yaz-marcdump -i marcxml -o marc file.xml > file.mrc`",
        path.display()
    )]
    UnsupportedFormat { label: String, path: PathBuf },

    #[error("Source {label}: file not found: {}", path.display())]
    SourceNotFound { label: String, path: PathBuf },

    #[error("Unknown output format for '{}': use .xml, .mrc, .marc, .dat or .iso2709", .0.display())]
    UnknownOutputFormat(PathBuf),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Record codec error: {0}")]
    Marc(#[from] crate::marc::MarcError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Exit codes used by the CLI.
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidArgs = 3,
    FileSystemError = 4,
}

pub type Result<T> = std::result::Result<T, CatalogError>;
