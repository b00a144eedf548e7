pub mod diagnostic;

pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics, Severity};

use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid confidence level {0}: expected a value strictly between 0 and 1")]
    InvalidConfidence(f64),

    /// A diagnostic upgraded by `strict` / `fatal`.
    #[error("fatal diagnostic [{}] {} (source: {})", .0.code, .0.message, .0.source)]
    Fatal(Box<Diagnostic>),

    #[error("no benchmark records found in {origin}")]
    EmptyDataset { origin: String },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AnalysisError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_fatal_diagnostic(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config{}: {source}", .path.as_ref().map(|p| format!(" '{p}'")).unwrap_or_default())]
    Parse {
        path: Option<String>,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid header template '{template}': {reason}")]
    HeaderTemplate { template: String, reason: String },

    #[error("invalid file pattern '{pattern}': {reason}")]
    FilePattern { pattern: String, reason: String },

    #[error("{0}")]
    Invalid(String),
}
