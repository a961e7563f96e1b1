//! Cache key computation.
//!
//! Provides [`CacheKey`], the file name an export is cached under.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::consts::KEY_DIGEST_LEN;
use crate::reference::DiagramReference;

/// File name of a cached export inside the cache directory.
///
/// Format: `{stem}-{digest}-{page}.{format}` where
/// - `stem` is the source file name with unsafe characters replaced by `_`
/// - `digest` is the first 16 hex digits of SHA-256 over the full source path
/// - `page` is `all` without a page index, else `p{n}`
///
/// Page and format are spelled out verbatim, so keys for the same source never
/// collide across pages or formats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the key for a source path, page index and output format.
    #[must_use]
    pub fn new(source_path: &Path, page_index: Option<u32>, format: &str) -> Self {
        let stem = source_path
            .file_name()
            .map(|name| sanitize(&name.to_string_lossy()))
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(source_path.to_string_lossy().as_bytes());
        let digest = hex::encode(hasher.finalize());

        let page = page_index.map_or_else(|| "all".to_owned(), |p| format!("p{p}"));
        let format = sanitize(format);

        Self(format!(
            "{stem}-{}-{page}.{format}",
            &digest[..KEY_DIGEST_LEN]
        ))
    }

    /// Compute the key for a resolved reference.
    #[must_use]
    pub fn for_reference(reference: &DiagramReference, format: &str) -> Self {
        Self::new(&reference.source_path, reference.page_index, format)
    }

    /// Key as a file name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keep ASCII alphanumerics, `-`, `_` and `.`; replace everything else.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
