//! Error types for diagram export.

use std::path::PathBuf;

/// Malformed diagram embed reference.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    /// The `#fragment` after the source path is not a non-negative integer.
    #[error("invalid page index {fragment:?} in diagram reference {url:?}")]
    InvalidPageIndex {
        /// Full embed URL as written in the document.
        url: String,
        /// Fragment text after `#`.
        fragment: String,
    },
    /// The embed target does not end with the configured source suffix.
    #[error("diagram reference {url:?} does not end with {suffix:?}")]
    UnsupportedSource {
        /// Full embed URL as written in the document.
        url: String,
        /// Expected source suffix (e.g. `.drawio`).
        suffix: String,
    },
    /// The resolved path climbs above the documentation root.
    #[error("diagram reference {url:?} resolves outside the docs directory")]
    OutsideDocsDir {
        /// Full embed URL as written in the document.
        url: String,
    },
}

/// Single diagram rendering error.
#[derive(Debug, thiserror::Error)]
#[error("failed to export {}: {kind}", source_path.display())]
pub struct RenderError {
    /// Diagram source that was being exported.
    pub source_path: PathBuf,
    /// What went wrong.
    pub kind: RenderErrorKind,
}

/// Kind of rendering error.
#[derive(Debug, thiserror::Error)]
pub enum RenderErrorKind {
    /// The renderer process could not be started.
    #[error("could not run renderer: {0}")]
    Spawn(String),
    /// The renderer exited unsuccessfully (`None` when killed by a signal).
    #[error("renderer exited with status {}: {stderr}", format_code(*.code))]
    ExitStatus {
        /// Process exit code.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
    /// Exit status 0 but the expected artifact is missing.
    #[error("renderer reported success but produced no output")]
    NoOutput,
}

fn format_code(code: Option<i32>) -> String {
    code.map_or_else(|| "(terminated by signal)".to_owned(), |c| c.to_string())
}

/// Error returned by the export cache and executable discovery.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Malformed embed reference.
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    /// Output format is not a plain file extension.
    #[error("invalid export format {0:?}: expected a plain file extension such as svg")]
    InvalidFormat(String),
    /// Draw.io executable could not be located.
    #[error("Draw.io executable not found: {0}")]
    ExecutableNotFound(String),
    /// Renderer invocation failed.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// Filesystem failure inside the cache directory.
    #[error("cache I/O error at {}: {source}", path.display())]
    CacheIo {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Referenced diagram source does not exist.
    #[error("diagram source not found: {}", .0.display())]
    SourceNotFound(PathBuf),
}

impl ExportError {
    pub(crate) fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheIo {
            path: path.into(),
            source,
        }
    }
}
