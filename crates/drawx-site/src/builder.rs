//! Static site builder.
//!
//! Walks the docs directory, rewrites diagram embeds in markdown documents,
//! copies every other file, then exports each distinct diagram once and
//! publishes it next to the pages that embed it.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use drawx_export::{CacheStatus, DiagramReference, ExportCache, ExportOptions, Resolver};
use rayon::prelude::*;

use crate::embed::EmbedRewriter;
use crate::error::SiteError;
use crate::publish::{copy_file, publish};

/// Configuration for a site build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Documentation source directory.
    pub docs_dir: PathBuf,
    /// Output directory.
    pub site_dir: PathBuf,
    /// Glob matching diagram embed targets.
    pub sources: String,
    /// Markup template for diagram embeds.
    pub embed_format: String,
    /// Renderer settings.
    pub export: ExportOptions,
}

/// Summary of a finished build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    /// Markdown documents rewritten.
    pub documents: usize,
    /// Other files copied verbatim.
    pub assets: usize,
    /// Distinct diagrams published.
    pub diagrams: usize,
    /// Diagrams served from the cache.
    pub hits: usize,
    /// Diagrams rendered during this build.
    pub misses: usize,
}

/// A file found in the docs directory.
#[derive(Debug)]
struct SourceFile {
    /// Path relative to the docs directory.
    rel: PathBuf,
    /// Absolute path.
    abs: PathBuf,
}

impl SourceFile {
    fn is_markdown(&self) -> bool {
        self.rel.extension().is_some_and(|e| e == "md")
    }
}

/// Builds a documentation site with exported diagrams.
pub struct SiteBuilder {
    config: BuildConfig,
    rewriter: EmbedRewriter,
    cache: ExportCache,
    /// Canonical docs directory the scan starts from.
    docs_root: PathBuf,
    /// Canonical directories never scanned: the site and the export cache.
    skip_dirs: [PathBuf; 2],
}

impl SiteBuilder {
    /// Create a builder exporting through `cache`.
    ///
    /// Creates the site directory. The docs directory must exist.
    pub fn new(config: BuildConfig, cache: ExportCache) -> Result<Self, SiteError> {
        let site_dir = &config.site_dir;
        fs::create_dir_all(site_dir).map_err(|e| SiteError::io(site_dir, e))?;

        // Relative and absolute spellings of one directory must compare equal.
        let canonical = |path: &Path| fs::canonicalize(path).map_err(|e| SiteError::io(path, e));
        let docs_root = canonical(&config.docs_dir)?;
        let skip_dirs = [canonical(site_dir)?, canonical(cache.cache_dir())?];

        // The sources glob decides which embeds are diagrams.
        let rewriter = EmbedRewriter::new(
            Resolver::new(&config.docs_dir).with_suffix(""),
            &config.sources,
            config.export.format.clone(),
            config.embed_format.clone(),
        )?;
        Ok(Self {
            config,
            rewriter,
            cache,
            docs_root,
            skip_dirs,
        })
    }

    /// Build the site.
    ///
    /// Stops at the first error: a diagram that fails to export fails the
    /// whole build rather than leaving a broken image behind.
    pub fn build(&self) -> Result<BuildReport, SiteError> {
        let site_dir = &self.config.site_dir;
        fs::create_dir_all(site_dir).map_err(|e| SiteError::io(site_dir, e))?;

        let mut files = Vec::new();
        self.scan_directory(&self.docs_root, Path::new(""), &mut files)?;
        let (documents, assets): (Vec<_>, Vec<_>) =
            files.into_iter().partition(SourceFile::is_markdown);

        assets
            .par_iter()
            .try_for_each(|file| copy_file(&file.abs, &site_dir.join(&file.rel)))?;

        let found = documents
            .par_iter()
            .map(|doc| self.build_document(doc))
            .collect::<Result<Vec<_>, _>>()?;

        let total: usize = found.iter().map(Vec::len).sum();
        let unique: BTreeSet<DiagramReference> = found.into_iter().flatten().collect();
        tracing::debug!("found {} unique diagrams in {total} total embeds", unique.len());

        let statuses = unique
            .par_iter()
            .map(|reference| self.export_and_publish(reference))
            .collect::<Result<Vec<_>, _>>()?;

        let hits = statuses.iter().filter(|&&s| s == CacheStatus::Hit).count();
        let report = BuildReport {
            documents: documents.len(),
            assets: assets.len(),
            diagrams: statuses.len(),
            hits,
            misses: statuses.len() - hits,
        };
        tracing::info!(
            documents = report.documents,
            assets = report.assets,
            diagrams = report.diagrams,
            hits = report.hits,
            misses = report.misses,
            "site built"
        );
        Ok(report)
    }

    /// Rewrite one markdown document into the site directory.
    fn build_document(&self, file: &SourceFile) -> Result<Vec<DiagramReference>, SiteError> {
        let markdown = fs::read_to_string(&file.abs).map_err(|e| SiteError::io(&file.abs, e))?;
        let rewritten = self
            .rewriter
            .rewrite(&file.rel, &markdown, |reference| self.load_content(reference))?;

        let dest = self.config.site_dir.join(&file.rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| SiteError::io(parent, e))?;
        }
        fs::write(&dest, rewritten.content).map_err(|e| SiteError::io(&dest, e))?;

        tracing::debug!(
            "rewrote {} ({} diagram embeds)",
            file.rel.display(),
            rewritten.references.len()
        );
        Ok(rewritten.references)
    }

    /// Export a diagram and return its content for inlining.
    fn load_content(&self, reference: &DiagramReference) -> Result<String, SiteError> {
        let result = self.cache.ensure_exported(reference, &self.config.export)?;
        fs::read_to_string(&result.artifact_path)
            .map_err(|e| SiteError::io(&result.artifact_path, e))
    }

    fn export_and_publish(&self, reference: &DiagramReference) -> Result<CacheStatus, SiteError> {
        let result = self.cache.ensure_exported(reference, &self.config.export)?;
        publish(
            &result.artifact_path,
            reference,
            &self.config.export.format,
            &self.config.site_dir,
        )?;
        Ok(result.status)
    }

    /// Collect files below `dir`, skipping hidden entries, the export cache
    /// and the site directory itself.
    fn scan_directory(
        &self,
        dir: &Path,
        rel_prefix: &Path,
        files: &mut Vec<SourceFile>,
    ) -> Result<(), SiteError> {
        let entries = fs::read_dir(dir).map_err(|e| SiteError::io(dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| SiteError::io(dir, e))?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }

            let path = entry.path();
            let rel = rel_prefix.join(&name);
            let is_dir = entry
                .file_type()
                .map_err(|e| SiteError::io(&path, e))?
                .is_dir();

            if is_dir {
                if self.skip_dirs.contains(&path) {
                    continue;
                }
                self.scan_directory(&path, &rel, files)?;
            } else {
                files.push(SourceFile { rel, abs: path });
            }
        }
        Ok(())
    }
}
