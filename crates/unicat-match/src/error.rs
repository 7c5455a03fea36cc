use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use unicat_core::CatalogError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Phase of a run in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Merge,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Read => "read",
            Stage::Merge => "merge",
            Stage::Write => "write",
        })
    }
}

#[derive(Debug, Error)]
pub enum UnionError {
    #[error("invalid ISBN: {0}")]
    InvalidIsbn(String),

    #[error("invalid ISSN: {0}")]
    InvalidIssn(String),

    #[error("configuration error: {0}")]
    Config(#[from] CatalogError),

    #[error("{stage} stage failed for source {label} ({}): {source}", path.display())]
    Source {
        stage: Stage,
        label: String,
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("merge stage failed for cluster {cluster_id}: {reason}")]
    Merge { cluster_id: usize, reason: String },

    #[error("write stage failed for {artifact} ({}): {source}", path.display())]
    Write {
        artifact: &'static str,
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

impl UnionError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            UnionError::Source { stage, .. } => Some(*stage),
            UnionError::Merge { .. } => Some(Stage::Merge),
            UnionError::Write { .. } => Some(Stage::Write),
            _ => None,
        }
    }

    pub(crate) fn read(label: &str, path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        UnionError::Source {
            stage: Stage::Read,
            label: label.to_string(),
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn write(
        artifact: &'static str,
        path: impl Into<PathBuf>,
        source: impl Into<BoxError>,
    ) -> Self {
        UnionError::Write {
            artifact,
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, UnionError>;
