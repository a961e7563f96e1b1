//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod export;

pub(crate) use build::BuildArgs;
pub(crate) use export::ExportArgs;

use drawx_config::Config;
use drawx_export::{CommandRenderer, ExportCache, ExportOptions, SystemLocator, resolve_executable};

use crate::error::CliError;

/// Open the export cache and renderer options described by `config`.
pub(crate) fn open_cache(config: &Config) -> Result<(ExportCache, ExportOptions), CliError> {
    let drawio = &config.drawio_resolved;
    let executable = resolve_executable(
        drawio.executable.as_deref(),
        &SystemLocator::for_current_platform(),
    )?;
    tracing::info!("using Draw.io executable {}", executable.display());

    let options = ExportOptions::new(executable)
        .format(drawio.format.clone())
        .args(drawio.args.clone());
    let cache = ExportCache::new(config.cache_dir(), Box::new(CommandRenderer))?;
    Ok((cache, options))
}
