//! CLI error types.

use drawx_config::ConfigError;
use drawx_export::ExportError;
use drawx_site::SiteError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Export(#[from] ExportError),

    #[error("{0}")]
    Site(#[from] SiteError),
}
