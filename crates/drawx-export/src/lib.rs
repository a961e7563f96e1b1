//! Draw.io export caching for documentation builds.
//!
//! This crate decides, for every diagram embedded in a document, whether a
//! cached rendering can be reused or Draw.io has to export it again:
//! - [`Resolver`] turns embed URLs like `arch.drawio#1` into [`DiagramReference`]s
//! - [`ExportCache`] owns the cache directory and runs the renderer on a miss
//! - [`Renderer`] / [`CommandRenderer`] invoke the Draw.io executable
//! - [`ExecutableLocator`] / [`SystemLocator`] find the executable
//!
//! # Architecture
//!
//! - [`reference`]: embed URL parsing and path resolution
//! - [`key`]: cache file naming
//! - [`cache`]: freshness checks and render orchestration
//! - [`render`]: renderer capability and subprocess implementation
//! - [`locate`]: executable discovery
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use drawx_export::{CommandRenderer, ExportCache, ExportOptions, Resolver};
//!
//! let resolver = Resolver::new("docs");
//! let reference = resolver.resolve("arch.drawio#1", Path::new("guide/index.md"))?;
//!
//! let cache = ExportCache::new("docs/drawio-exporter", Box::new(CommandRenderer))?;
//! let result = cache.ensure_exported(&reference, &ExportOptions::new("/opt/draw.io/drawio"))?;
//! println!("{}", result.artifact_path.display());
//! ```

pub mod cache;
mod consts;
mod error;
pub mod key;
pub mod locate;
#[cfg(any(test, feature = "mock"))]
mod mock;
pub mod reference;
pub mod render;

pub use cache::{CacheStatus, ExportCache, ExportOptions, ExportResult};
pub use consts::{DEFAULT_FORMAT, DEFAULT_SOURCE_SUFFIX, EXECUTABLE_NAMES};
pub use error::{ExportError, ReferenceError, RenderError, RenderErrorKind};
pub use key::CacheKey;
pub use locate::{ExecutableLocator, FixedLocator, SystemLocator, resolve_executable};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockBehavior, MockRenderer};
pub use reference::{DiagramReference, Resolver, published_name, split_page_fragment};
pub use render::{CommandRenderer, RenderOutcome, RenderRequest, Renderer};
