//! Export cache manager.
//!
//! [`ExportCache`] owns the cache directory and decides, per diagram
//! reference, whether the cached artifact can be reused or the renderer has to
//! run again.
//!
//! # Freshness
//!
//! An artifact is fresh when it exists and its mtime is not older than the
//! source's mtime. The comparison is non-strict: an artifact written within
//! the same timestamp tick as the source counts as fresh.
//!
//! # Concurrency
//!
//! Calls for the same [`CacheKey`] are serialized through a per-key lock so
//! two threads never render into the same artifact at once. Calls for
//! different keys proceed independently.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use crate::consts::DEFAULT_FORMAT;
use crate::error::{ExportError, RenderError, RenderErrorKind};
use crate::key::CacheKey;
use crate::reference::DiagramReference;
use crate::render::{RenderRequest, Renderer};

/// Whether an export was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Cached artifact was fresh; the renderer did not run.
    Hit,
    /// The renderer ran and produced a new artifact.
    Miss,
}

/// Result of [`ExportCache::ensure_exported`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    /// Cached artifact holding a current rendering.
    pub artifact_path: PathBuf,
    /// Hit or miss.
    pub status: CacheStatus,
}

/// Renderer settings applied to every export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Output image format (e.g. `svg`, `png`).
    pub format: String,
    /// Draw.io executable.
    pub drawio_executable: PathBuf,
    /// Extra arguments appended to every invocation.
    pub drawio_args: Vec<String>,
}

impl ExportOptions {
    /// Options exporting SVG with `drawio_executable` and no extra arguments.
    #[must_use]
    pub fn new(drawio_executable: impl Into<PathBuf>) -> Self {
        Self {
            format: DEFAULT_FORMAT.to_owned(),
            drawio_executable: drawio_executable.into(),
            drawio_args: Vec::new(),
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Set the extra renderer arguments.
    #[must_use]
    pub fn args(mut self, args: Vec<String>) -> Self {
        self.drawio_args = args;
        self
    }
}

/// Lock table serializing work on the same cache key.
#[derive(Default)]
struct KeyLocks {
    locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    fn lock_for(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }
}

/// Cache of rendered diagrams, rooted at a directory on disk.
///
/// Directory layout:
/// ```text
/// {cache_dir}/
/// +-- arch.drawio-1f0c...-all.svg   # whole document
/// +-- arch.drawio-1f0c...-p0.svg    # page 0
/// +-- arch.drawio-1f0c...-p1.svg    # page 1
/// ```
///
/// Entries are overwritten when their source changes and are never deleted
/// otherwise.
pub struct ExportCache {
    cache_dir: PathBuf,
    renderer: Box<dyn Renderer>,
    locks: KeyLocks,
}

impl ExportCache {
    /// Open the cache at `cache_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::CacheIo`] if the directory cannot be created.
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        renderer: Box<dyn Renderer>,
    ) -> Result<Self, ExportError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(|e| ExportError::cache_io(&cache_dir, e))?;
        Ok(Self {
            cache_dir,
            renderer,
            locks: KeyLocks::default(),
        })
    }

    /// Cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Make sure the cached artifact for `reference` reflects its source.
    ///
    /// Reuses a fresh artifact, otherwise renders exactly once. On success the
    /// returned `artifact_path` holds a current rendering.
    ///
    /// # Errors
    ///
    /// - [`ExportError::InvalidFormat`] if the format is not a plain file extension
    /// - [`ExportError::SourceNotFound`] if the source file is missing
    /// - [`ExportError::Render`] if the renderer fails or writes nothing
    /// - [`ExportError::CacheIo`] on cache filesystem failures
    pub fn ensure_exported(
        &self,
        reference: &DiagramReference,
        options: &ExportOptions,
    ) -> Result<ExportResult, ExportError> {
        if !is_plain_extension(&options.format) {
            return Err(ExportError::InvalidFormat(options.format.clone()));
        }

        let key = CacheKey::for_reference(reference, &options.format);
        let artifact_path = self.cache_dir.join(key.as_str());

        let lock = self.locks.lock_for(&key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let source_mtime = source_mtime(&reference.source_path)?;
        if is_fresh(&artifact_path, source_mtime) {
            tracing::debug!("source unchanged, using cached {}", artifact_path.display());
            return Ok(ExportResult {
                artifact_path,
                status: CacheStatus::Hit,
            });
        }

        // A stale artifact must not survive a renderer that writes nothing.
        match fs::remove_file(&artifact_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ExportError::cache_io(&artifact_path, e)),
        }

        tracing::info!(
            "exporting {} to {}",
            reference.source_path.display(),
            artifact_path.display()
        );

        let request = RenderRequest {
            executable: options.drawio_executable.clone(),
            source: reference.source_path.clone(),
            page_index: reference.page_index,
            format: options.format.clone(),
            output: artifact_path.clone(),
            extra_args: options.drawio_args.clone(),
        };

        let render_error = |kind| RenderError {
            source_path: reference.source_path.clone(),
            kind,
        };

        let outcome = self
            .renderer
            .invoke(request)
            .map_err(|e| render_error(RenderErrorKind::Spawn(e.to_string())))?;

        if !outcome.is_success() {
            return Err(render_error(RenderErrorKind::ExitStatus {
                code: outcome.status,
                stderr: outcome.stderr.trim_end().to_owned(),
            })
            .into());
        }

        if !artifact_path.is_file() {
            return Err(render_error(RenderErrorKind::NoOutput).into());
        }

        Ok(ExportResult {
            artifact_path,
            status: CacheStatus::Miss,
        })
    }
}

fn source_mtime(path: &Path) -> Result<SystemTime, ExportError> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ExportError::SourceNotFound(path.to_path_buf())
            } else {
                ExportError::cache_io(path, e)
            }
        })
}

/// Formats end up in cache file names; `s/g` and `s_g` must not share a key.
fn is_plain_extension(format: &str) -> bool {
    !format.is_empty() && format.chars().all(|c| c.is_ascii_alphanumeric())
}

/// True if `artifact` exists and is not older than `source_mtime`.
fn is_fresh(artifact: &Path, source_mtime: SystemTime) -> bool {
    fs::metadata(artifact)
        .and_then(|m| m.modified())
        .is_ok_and(|cached| cached >= source_mtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBehavior, MockRenderer};
    use crate::reference::Resolver;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        docs: PathBuf,
        cache_dir: PathBuf,
        renderer: MockRenderer,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let docs = tmp.path().join("docs");
            fs::create_dir_all(&docs).unwrap();
            let cache_dir = docs.join("drawio-exporter");
            Self {
                _tmp: tmp,
                docs,
                cache_dir,
                renderer: MockRenderer::new(),
            }
        }

        fn cache(&self) -> ExportCache {
            ExportCache::new(&self.cache_dir, Box::new(self.renderer.clone())).unwrap()
        }

        fn source(&self, name: &str) -> PathBuf {
            let path = self.docs.join(name);
            fs::write(&path, "<mxfile/>").unwrap();
            path
        }

        fn reference(&self, url: &str) -> DiagramReference {
            Resolver::new(&self.docs)
                .resolve(url, Path::new("index.md"))
                .unwrap()
        }
    }

    fn options() -> ExportOptions {
        ExportOptions::new("/opt/draw.io/drawio")
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn test_new_creates_cache_dir() {
        let fixture = Fixture::new();
        assert!(!fixture.cache_dir.exists());
        let cache = fixture.cache();
        assert!(cache.cache_dir().is_dir());
    }

    #[test]
    fn test_new_fails_when_cache_dir_is_a_file() {
        let fixture = Fixture::new();
        fs::write(&fixture.cache_dir, b"not a dir").unwrap();
        let result = ExportCache::new(&fixture.cache_dir, Box::new(MockRenderer::new()));
        assert!(matches!(result, Err(ExportError::CacheIo { .. })));
    }

    #[test]
    fn test_second_call_hits() {
        let fixture = Fixture::new();
        fixture.source("diagram.drawio");
        let cache = fixture.cache();
        let reference = fixture.reference("diagram.drawio");

        let first = cache.ensure_exported(&reference, &options()).unwrap();
        assert_eq!(first.status, CacheStatus::Miss);
        let first_bytes = fs::read(&first.artifact_path).unwrap();

        let second = cache.ensure_exported(&reference, &options()).unwrap();
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.artifact_path, first.artifact_path);
        assert_eq!(fs::read(&second.artifact_path).unwrap(), first_bytes);
        assert_eq!(fixture.renderer.invocations(), 1);
    }

    #[test]
    fn test_touching_source_invalidates() {
        let fixture = Fixture::new();
        let source = fixture.source("diagram.drawio");
        let cache = fixture.cache();
        let reference = fixture.reference("diagram.drawio");

        let first = cache.ensure_exported(&reference, &options()).unwrap();
        assert_eq!(first.status, CacheStatus::Miss);

        let artifact_mtime = fs::metadata(&first.artifact_path)
            .unwrap()
            .modified()
            .unwrap();
        set_mtime(&source, artifact_mtime + Duration::from_secs(1));

        let second = cache.ensure_exported(&reference, &options()).unwrap();
        assert_eq!(second.status, CacheStatus::Miss);
        assert_eq!(fixture.renderer.invocations(), 2);
    }

    #[test]
    fn test_same_mtime_counts_as_fresh() {
        let fixture = Fixture::new();
        let source = fixture.source("diagram.drawio");
        let cache = fixture.cache();
        let reference = fixture.reference("diagram.drawio");

        let first = cache.ensure_exported(&reference, &options()).unwrap();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&source, t);
        set_mtime(&first.artifact_path, t);

        let second = cache.ensure_exported(&reference, &options()).unwrap();
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(fixture.renderer.invocations(), 1);
    }

    #[test]
    fn test_pages_use_separate_artifacts() {
        let fixture = Fixture::new();
        fixture.source("a.drawio");
        let cache = fixture.cache();

        let paths: Vec<PathBuf> = ["a.drawio", "a.drawio#0", "a.drawio#1"]
            .into_iter()
            .map(|url| {
                let result = cache
                    .ensure_exported(&fixture.reference(url), &options())
                    .unwrap();
                assert_eq!(result.status, CacheStatus::Miss, "{url}");
                result.artifact_path
            })
            .collect();

        assert_ne!(paths[0], paths[1]);
        assert_ne!(paths[1], paths[2]);
        assert_ne!(paths[0], paths[2]);
        assert!(paths.iter().all(|p| p.is_file()));
        assert_eq!(fixture.renderer.invocations(), 3);

        let requests = fixture.renderer.requests();
        assert_eq!(
            requests.iter().map(|r| r.page_index).collect::<Vec<_>>(),
            vec![None, Some(0), Some(1)]
        );
    }

    #[test]
    fn test_request_carries_options() {
        let fixture = Fixture::new();
        fixture.source("a.drawio");
        let cache = fixture.cache();
        let opts = options().format("png").args(vec!["--transparent".to_owned()]);

        let result = cache
            .ensure_exported(&fixture.reference("a.drawio#3"), &opts)
            .unwrap();

        let request = fixture.renderer.requests().pop().unwrap();
        assert_eq!(request.executable, PathBuf::from("/opt/draw.io/drawio"));
        assert_eq!(request.source, fixture.docs.join("a.drawio"));
        assert_eq!(request.page_index, Some(3));
        assert_eq!(request.format, "png");
        assert_eq!(request.output, result.artifact_path);
        assert_eq!(request.extra_args, vec!["--transparent".to_owned()]);
        assert!(result.artifact_path.to_string_lossy().ends_with("-p3.png"));
    }

    #[test]
    fn test_success_without_output_is_error() {
        let fixture = Fixture::new();
        fixture.source("a.drawio");
        let renderer = MockRenderer::with_behavior(MockBehavior::SucceedWithoutOutput);
        let cache = ExportCache::new(&fixture.cache_dir, Box::new(renderer)).unwrap();

        let err = cache
            .ensure_exported(&fixture.reference("a.drawio"), &options())
            .unwrap_err();
        assert!(
            matches!(
                err,
                ExportError::Render(RenderError {
                    kind: RenderErrorKind::NoOutput,
                    ..
                })
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn test_stale_artifact_does_not_mask_missing_output() {
        let fixture = Fixture::new();
        let source = fixture.source("a.drawio");
        let reference = fixture.reference("a.drawio");

        let good = fixture.cache();
        let first = good.ensure_exported(&reference, &options()).unwrap();
        let artifact_mtime = fs::metadata(&first.artifact_path)
            .unwrap()
            .modified()
            .unwrap();
        set_mtime(&source, artifact_mtime + Duration::from_secs(1));

        let silent = MockRenderer::with_behavior(MockBehavior::SucceedWithoutOutput);
        let cache = ExportCache::new(&fixture.cache_dir, Box::new(silent)).unwrap();
        let result = cache.ensure_exported(&reference, &options());
        assert!(matches!(result, Err(ExportError::Render(_))));
        assert!(!first.artifact_path.exists());
    }

    #[test]
    fn test_nonzero_exit_carries_stderr() {
        let fixture = Fixture::new();
        fixture.source("a.drawio");
        let renderer = MockRenderer::with_behavior(MockBehavior::Fail {
            code: 1,
            stderr: "Error: invalid file\n".to_owned(),
        });
        let cache = ExportCache::new(&fixture.cache_dir, Box::new(renderer)).unwrap();

        let err = cache
            .ensure_exported(&fixture.reference("a.drawio"), &options())
            .unwrap_err();
        match err {
            ExportError::Render(RenderError {
                kind: RenderErrorKind::ExitStatus { code, stderr },
                ..
            }) => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "Error: invalid file");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_spawn_failure_is_render_error() {
        let fixture = Fixture::new();
        fixture.source("a.drawio");
        let renderer = MockRenderer::with_behavior(MockBehavior::SpawnError);
        let cache = ExportCache::new(&fixture.cache_dir, Box::new(renderer)).unwrap();

        let err = cache
            .ensure_exported(&fixture.reference("a.drawio"), &options())
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::Render(RenderError {
                kind: RenderErrorKind::Spawn(_),
                ..
            })
        ));
    }

    #[test]
    fn test_missing_source() {
        let fixture = Fixture::new();
        let cache = fixture.cache();
        let err = cache
            .ensure_exported(&fixture.reference("missing.drawio"), &options())
            .unwrap_err();
        assert!(matches!(err, ExportError::SourceNotFound(_)));
        assert_eq!(fixture.renderer.invocations(), 0);
    }

    #[test]
    fn test_format_must_be_plain_extension() {
        let fixture = Fixture::new();
        fixture.source("diagram.drawio");
        let cache = fixture.cache();
        let reference = fixture.reference("diagram.drawio");

        for format in ["s/g", "s_g", "", "../svg"] {
            let err = cache
                .ensure_exported(&reference, &options().format(format))
                .unwrap_err();
            assert!(
                matches!(&err, ExportError::InvalidFormat(f) if f == format),
                "{format:?}: {err:?}"
            );
        }
        assert_eq!(fixture.renderer.invocations(), 0);

        let png = cache
            .ensure_exported(&reference, &options().format("png"))
            .unwrap();
        assert_eq!(png.status, CacheStatus::Miss);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let fixture = Fixture::new();
        let source = fixture.source("diagram.drawio");
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        set_mtime(&source, t0);

        let cache = fixture.cache();
        let reference = fixture.reference("diagram.drawio");
        let opts = options().format("svg");

        let first = cache.ensure_exported(&reference, &opts).unwrap();
        assert_eq!(first.status, CacheStatus::Miss);
        assert_eq!(first.artifact_path.parent(), Some(fixture.cache_dir.as_path()));
        assert_eq!(first.artifact_path.extension().unwrap(), "svg");
        assert_eq!(fixture.renderer.invocations(), 1);

        let second = cache.ensure_exported(&reference, &opts).unwrap();
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.artifact_path, first.artifact_path);
        assert_eq!(fixture.renderer.invocations(), 1);

        // Artifact was written "now", far after t0; pin it to t0 so that
        // t0 + 1s is newer than the cached copy.
        set_mtime(&first.artifact_path, t0);
        set_mtime(&source, t0 + Duration::from_secs(1));

        let third = cache.ensure_exported(&reference, &opts).unwrap();
        assert_eq!(third.status, CacheStatus::Miss);
        assert_eq!(third.artifact_path, first.artifact_path);
        assert_eq!(fixture.renderer.invocations(), 2);
    }

    #[test]
    fn test_concurrent_calls_for_same_key_render_once() {
        let fixture = Fixture::new();
        fixture.source("a.drawio");
        let cache = fixture.cache();
        let reference = fixture.reference("a.drawio#0");

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| cache.ensure_exported(&reference, &options()).unwrap());
            }
        });

        assert_eq!(fixture.renderer.invocations(), 1);
    }
}
