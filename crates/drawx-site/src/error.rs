//! Site build error types.

use std::path::PathBuf;

use drawx_export::{ExportError, ReferenceError};

/// Error returned while rewriting documents or building the site.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// Diagram export failed.
    #[error(transparent)]
    Export(#[from] ExportError),
    /// A document contains a malformed diagram reference.
    #[error("{}: {source}", document.display())]
    Reference {
        /// Document containing the reference, relative to the docs directory.
        document: PathBuf,
        /// What was wrong with it.
        source: ReferenceError,
    },
    /// The `sources` glob does not parse.
    #[error("invalid sources pattern {pattern:?}: {message}")]
    InvalidSources {
        /// Pattern as configured.
        pattern: String,
        /// Parser message.
        message: String,
    },
    /// Reading or writing a site file failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl SiteError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
