//! Publishing cached exports into the site directory.

use std::fs;
use std::path::{Path, PathBuf};

use drawx_export::DiagramReference;

use crate::error::SiteError;

/// Copy `artifact` to the published location of `reference` under `site_dir`.
///
/// Returns the destination path.
pub fn publish(
    artifact: &Path,
    reference: &DiagramReference,
    format: &str,
    site_dir: &Path,
) -> Result<PathBuf, SiteError> {
    let dest = site_dir.join(reference.published_rel(format));
    copy_file(artifact, &dest)?;
    tracing::debug!("published {} to {}", artifact.display(), dest.display());
    Ok(dest)
}

/// Copy a file, creating the destination's parent directories.
pub(crate) fn copy_file(from: &Path, to: &Path) -> Result<(), SiteError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| SiteError::io(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| SiteError::io(from, e))?;
    Ok(())
}
