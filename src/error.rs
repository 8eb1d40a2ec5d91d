//! Errors raised while reading required metric sources

use std::path::PathBuf;

/// A required pseudo-file could not be read or parsed.
///
/// Both variants mean the host does not expose the signals the report needs;
/// callers treat them the same way and fail the whole collection.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metrics source {} is unavailable: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics source {} is malformed: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

impl MetricsError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Path of the pseudo-file that failed
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Unavailable { path, .. } | Self::Malformed { path, .. } => path,
        }
    }
}

pub type MetricsResult<T> = std::result::Result<T, MetricsError>;

/// Read a required pseudo-file to a string
pub(crate) fn read_required(path: &std::path::Path) -> MetricsResult<String> {
    std::fs::read_to_string(path).map_err(|source| MetricsError::Unavailable {
        path: path.to_path_buf(),
        source,
    })
}
