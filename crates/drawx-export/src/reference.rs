//! Diagram reference resolution.
//!
//! Turns an embed target written in a document (e.g. `../arch.drawio#2`) into
//! a [`DiagramReference`]: an absolute source path plus an optional page index.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::consts::DEFAULT_SOURCE_SUFFIX;
use crate::error::ReferenceError;

/// A diagram embedded by a document.
///
/// Two references with equal `source_path` and `page_index` always map to the
/// same cache entry. Ordering is by path then page, which gives builds a
/// deterministic export order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiagramReference {
    /// Absolute path of the `.drawio` source.
    pub source_path: PathBuf,
    /// Source path relative to the docs directory, `/`-separated.
    pub source_rel: String,
    /// Page to export; `None` exports the renderer's default page.
    pub page_index: Option<u32>,
}

impl DiagramReference {
    /// Site-relative path the exported image is published under.
    ///
    /// `arch.drawio` page 2 as SVG becomes `arch.drawio-2.svg`; without a page
    /// index it becomes `arch.drawio.svg`.
    #[must_use]
    pub fn published_rel(&self, format: &str) -> String {
        published_name(&self.source_rel, self.page_index, format)
    }
}

/// Append the page and format suffix used for published images.
#[must_use]
pub fn published_name(target: &str, page_index: Option<u32>, format: &str) -> String {
    match page_index {
        Some(page) => format!("{target}-{page}.{format}"),
        None => format!("{target}.{format}"),
    }
}

/// Resolves embed URLs relative to the documents that contain them.
#[derive(Debug, Clone)]
pub struct Resolver {
    docs_dir: PathBuf,
    suffix: String,
}

impl Resolver {
    /// Create a resolver rooted at `docs_dir` accepting `.drawio` sources.
    #[must_use]
    pub fn new(docs_dir: impl Into<PathBuf>) -> Self {
        Self {
            docs_dir: docs_dir.into(),
            suffix: DEFAULT_SOURCE_SUFFIX.to_owned(),
        }
    }

    /// Accept sources ending with `suffix` instead of `.drawio`.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Resolve `embed_url` found in `document`.
    ///
    /// `document` is the embedding page's path relative to the docs directory
    /// (an absolute path inside the docs directory is accepted too; one outside
    /// it is [`ReferenceError::OutsideDocsDir`]). A leading `/` in the embed
    /// URL makes it relative to the docs directory instead.
    pub fn resolve(
        &self,
        embed_url: &str,
        document: &Path,
    ) -> Result<DiagramReference, ReferenceError> {
        let (target, page_index) = split_page_fragment(embed_url)?;
        let target = percent_decode_str(target).decode_utf8_lossy();

        if !target.ends_with(&self.suffix) {
            return Err(ReferenceError::UnsupportedSource {
                url: embed_url.to_owned(),
                suffix: self.suffix.clone(),
            });
        }

        let outside = || ReferenceError::OutsideDocsDir {
            url: embed_url.to_owned(),
        };

        let mut segments: Vec<String> = Vec::new();
        if !target.starts_with('/') {
            let document = match document.strip_prefix(&self.docs_dir) {
                Ok(rel) => rel,
                Err(_) if document.has_root() => return Err(outside()),
                Err(_) => document,
            };
            if let Some(dir) = document.parent() {
                for component in dir.components() {
                    match component {
                        Component::Normal(name) => {
                            segments.push(name.to_string_lossy().into_owned());
                        }
                        Component::ParentDir => {
                            segments.pop().ok_or_else(outside)?;
                        }
                        Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
                    }
                }
            }
        }

        for segment in target.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop().ok_or_else(outside)?;
                }
                name => segments.push(name.to_owned()),
            }
        }

        let source_rel = segments.join("/");
        let source_path = segments
            .iter()
            .fold(self.docs_dir.clone(), |path, segment| path.join(segment));

        Ok(DiagramReference {
            source_path,
            source_rel,
            page_index,
        })
    }
}

/// Split a trailing `#<page>` fragment off an embed URL.
///
/// Returns the target without the fragment and the parsed page index.
pub fn split_page_fragment(embed_url: &str) -> Result<(&str, Option<u32>), ReferenceError> {
    match embed_url.rsplit_once('#') {
        Some((target, fragment)) => {
            let page = fragment
                .parse::<u32>()
                .map_err(|_| ReferenceError::InvalidPageIndex {
                    url: embed_url.to_owned(),
                    fragment: fragment.to_owned(),
                })?;
            Ok((target, Some(page)))
        }
        None => Ok((embed_url, None)),
    }
}
