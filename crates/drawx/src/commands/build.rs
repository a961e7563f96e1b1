//! `drawx build` command implementation.

use std::path::PathBuf;

use clap::Args;
use drawx_config::{CliSettings, Config};
use drawx_site::{BuildConfig, SiteBuilder};

use super::open_cache;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover drawx.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Markdown source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output directory for the generated site (overrides config).
    #[arg(short = 'o', long)]
    site_dir: Option<PathBuf>,

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

impl BuildArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            site_dir: self.site_dir,
            drawio_executable: self.drawio_executable,
            format: self.format,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let docs = &config.docs_resolved;
        output.info(&format!("Source: {}", docs.source_dir.display()));
        output.info(&format!("Output: {}", docs.site_dir.display()));

        let (cache, export) = open_cache(&config)?;
        let build_config = BuildConfig {
            docs_dir: docs.source_dir.clone(),
            site_dir: docs.site_dir.clone(),
            sources: config.drawio_resolved.sources.clone(),
            embed_format: config.drawio_resolved.embed_format.clone(),
            export,
        };

        let report = SiteBuilder::new(build_config, cache)?.build()?;

        output.success(&format!(
            "Site built to {}: {} pages, {} diagrams ({} rendered, {} cached)",
            docs.site_dir.display(),
            report.documents,
            report.diagrams,
            report.misses,
            report.hits,
        ));
        Ok(())
    }
}
