//! Errors from page rendering and output writing.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias for results within the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Errors that stop a build. Descriptor failures are not among them; they are
/// reported per file in the build summary.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown page format: '{name}'. Available formats: markdown, text, json")]
    UnknownFormat { name: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("build cancelled")]
    Cancelled,
}

impl RenderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::Io {
            path: path.into(),
            source,
        }
    }
}
