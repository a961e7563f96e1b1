//! Site building with Draw.io diagram exports.
//!
//! This crate provides:
//! - [`EmbedRewriter`]: Replaces diagram image embeds in markdown
//! - [`SiteBuilder`]: Copies a docs directory to a site directory, exporting
//!   and publishing every embedded diagram
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use drawx_export::{CommandRenderer, ExportCache, ExportOptions};
//! use drawx_site::{BuildConfig, SiteBuilder};
//!
//! let cache = ExportCache::new("docs/drawio-exporter", Box::new(CommandRenderer))?;
//! let config = BuildConfig {
//!     docs_dir: "docs".into(),
//!     site_dir: "site".into(),
//!     sources: "*.drawio".to_owned(),
//!     embed_format: r#"<img alt="{img_alt}" src="{img_src}">"#.to_owned(),
//!     export: ExportOptions::new("/usr/bin/drawio"),
//! };
//!
//! let report = SiteBuilder::new(config, cache)?.build()?;
//! println!("{} diagrams, {} rendered", report.diagrams, report.misses);
//! # Ok(())
//! # }
//! ```

mod builder;
mod embed;
mod error;
mod publish;

pub use builder::{BuildConfig, BuildReport, SiteBuilder};
pub use embed::{EmbedRewriter, Rewritten};
pub use error::SiteError;
pub use publish::publish;
