//! Error type shared by every stage of the report pipeline.

use std::io;
use std::path::PathBuf;

/// Everything that can abort a report run. None of these are recovered.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing expected column '{0}'")]
    MissingColumn(String),

    #[error("line {line}: cannot parse {column} value '{value}' as a date")]
    InvalidDate {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("no \"{0}\" shipments in the dataset; the executive summary cannot be written")]
    MissingStatus(String),

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("font error: {0}")]
    Font(String),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("PDF metadata update failed: {0}")]
    Metadata(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<genpdf::error::Error> for ReportError {
    fn from(err: genpdf::error::Error) -> Self {
        Self::Pdf(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
