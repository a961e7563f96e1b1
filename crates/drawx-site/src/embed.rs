//! Markdown image embed rewriting.
//!
//! Finds `![alt](target)` embeds whose target is a diagram source and replaces
//! them with the configured embed template. Targets that do not match the
//! `sources` glob are left exactly as written.
//!
//! # Template placeholders
//!
//! - `{img_alt}`: alt text of the original embed
//! - `{img_src}`: published image path, relative to the page
//! - `{content}`: exported file content (SVG only, loaded on demand)

use std::path::Path;
use std::sync::LazyLock;

use drawx_export::{DiagramReference, Resolver, published_name, split_page_fragment};
use glob::Pattern;
use regex::{Captures, Regex};

use crate::error::SiteError;

/// Markdown image embed: `![alt](target)`.
static IMAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[(?P<alt>[^\]]*)\]\((?P<target>[^\)]*)\)").expect("invalid image regex")
});

const ALT_PLACEHOLDER: &str = "{img_alt}";
const SRC_PLACEHOLDER: &str = "{img_src}";
const CONTENT_PLACEHOLDER: &str = "{content}";

/// Result of rewriting one document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Rewritten {
    /// Document text with diagram embeds replaced.
    pub content: String,
    /// Diagram references found, in document order (may repeat).
    pub references: Vec<DiagramReference>,
}

/// Rewrites diagram embeds in markdown documents.
#[derive(Debug, Clone)]
pub struct EmbedRewriter {
    resolver: Resolver,
    sources: Pattern,
    format: String,
    embed_format: String,
}

impl EmbedRewriter {
    /// Create a rewriter.
    ///
    /// # Arguments
    ///
    /// * `resolver` - Resolves embed targets against the docs directory
    /// * `sources` - Glob matched against embed targets (fragment removed)
    /// * `format` - Published image format (e.g. `svg`)
    /// * `embed_format` - Replacement template
    pub fn new(
        resolver: Resolver,
        sources: &str,
        format: impl Into<String>,
        embed_format: impl Into<String>,
    ) -> Result<Self, SiteError> {
        let sources = Pattern::new(sources).map_err(|e| SiteError::InvalidSources {
            pattern: sources.to_owned(),
            message: e.to_string(),
        })?;
        Ok(Self {
            resolver,
            sources,
            format: format.into(),
            embed_format: embed_format.into(),
        })
    }

    /// True if the template needs the exported file content.
    #[must_use]
    pub fn inlines_content(&self) -> bool {
        self.embed_format.contains(CONTENT_PLACEHOLDER)
    }

    /// True if `target` (fragment removed) names a diagram source.
    fn is_source(&self, target: &str) -> bool {
        let path = target.rsplit_once('#').map_or(target, |(path, _)| path);
        self.sources.matches(path)
    }

    /// Rewrite the diagram embeds of one document.
    ///
    /// `document` is the page path relative to the docs directory.
    /// `load_content` is called for each diagram only when the template
    /// contains `{content}`; it must return the exported file's text.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::Reference`] for a malformed diagram reference, or
    /// whatever `load_content` returns.
    pub fn rewrite<F>(
        &self,
        document: &Path,
        markdown: &str,
        mut load_content: F,
    ) -> Result<Rewritten, SiteError>
    where
        F: FnMut(&DiagramReference) -> Result<String, SiteError>,
    {
        let mut content = String::with_capacity(markdown.len());
        let mut references = Vec::new();
        let mut last = 0;

        for caps in IMAGE_PATTERN.captures_iter(markdown) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let target = &caps["target"];
            if !self.is_source(target) {
                continue;
            }

            let reference_error = |source| SiteError::Reference {
                document: document.to_path_buf(),
                source,
            };
            let (written_path, page_index) =
                split_page_fragment(target).map_err(reference_error)?;
            let reference = self
                .resolver
                .resolve(target, document)
                .map_err(reference_error)?;

            let inline = if self.inlines_content() {
                load_content(&reference)?
            } else {
                String::new()
            };

            content.push_str(&markdown[last..whole.start()]);
            content.push_str(&self.render_embed(&caps, written_path, page_index, &inline));
            last = whole.end();

            references.push(reference);
        }

        content.push_str(&markdown[last..]);
        Ok(Rewritten {
            content,
            references,
        })
    }

    fn render_embed(
        &self,
        caps: &Captures<'_>,
        written_path: &str,
        page_index: Option<u32>,
        inline: &str,
    ) -> String {
        let img_src = published_name(written_path, page_index, &self.format);
        fill_template(
            &self.embed_format,
            &[
                (ALT_PLACEHOLDER, &caps["alt"]),
                (SRC_PLACEHOLDER, img_src.as_str()),
                (CONTENT_PLACEHOLDER, inline),
            ],
        )
    }
}

/// Substitute placeholders in a single pass.
///
/// Substituted values are never scanned again, so a diagram containing
/// `{img_alt}` text is inlined verbatim.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    'outer: while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        for (placeholder, value) in values {
            if let Some(after) = rest.strip_prefix(placeholder) {
                out.push_str(value);
                rest = after;
                continue 'outer;
            }
        }
        out.push('{');
        rest = &rest[1..];
    }
    out.push_str(rest);
    out
}
