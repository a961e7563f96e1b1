//! `drawx export` command implementation.

use std::path::PathBuf;

use clap::Args;
use drawx_config::{CliSettings, Config};
use drawx_export::{CacheStatus, Resolver};

use super::open_cache;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the export command.
#[derive(Args)]
pub(crate) struct ExportArgs {
    /// Embed URL as written in markdown, e.g. `diagrams/arch.drawio#1`.
    url: String,

    /// Page containing the embed, relative to the source directory.
    #[arg(short, long, default_value = "index.md")]
    page: PathBuf,

    /// Path to configuration file (default: auto-discover drawx.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Markdown source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Draw.io executable (overrides config and PATH lookup).
    #[arg(long, env = "DRAWX_DRAWIO_EXECUTABLE")]
    drawio_executable: Option<PathBuf>,

    /// Export format, e.g. svg or png (overrides config).
    #[arg(short, long)]
    format: Option<String>,

    /// Enable verbose output (log renders and cache decisions).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ExportArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            drawio_executable: self.drawio_executable,
            format: self.format,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let resolver = Resolver::new(&config.docs_resolved.source_dir);
        let reference = resolver
            .resolve(&self.url, &self.page)
            .map_err(drawx_export::ExportError::from)?;

        let (cache, options) = open_cache(&config)?;
        let result = cache.ensure_exported(&reference, &options)?;

        output.status(
            result.status == CacheStatus::Hit,
            &result.artifact_path.display().to_string(),
        );
        Ok(())
    }
}
