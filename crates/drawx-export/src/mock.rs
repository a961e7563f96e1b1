//! Mock renderer for testing.
//!
//! Provides [`MockRenderer`] for exercising the export cache without
//! launching Draw.io.

use std::fs;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use crate::render::{RenderOutcome, RenderRequest, Renderer};

/// How a [`MockRenderer`] responds to requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Write a small SVG naming the source and page, then exit 0.
    WriteOutput,
    /// Exit 0 without writing anything.
    SucceedWithoutOutput,
    /// Exit with `code`, printing `stderr`.
    Fail {
        /// Exit code.
        code: i32,
        /// Standard error text.
        stderr: String,
    },
    /// Fail to start the process.
    SpawnError,
}

#[derive(Debug, Default)]
struct MockState {
    requests: Vec<RenderRequest>,
}

/// Renderer that records requests instead of running Draw.io.
///
/// Clones share the same request log, so a test can keep one handle while the
/// cache owns another.
///
/// # Example
///
/// ```ignore
/// use drawx_export::{ExportCache, MockRenderer};
///
/// let renderer = MockRenderer::new();
/// let cache = ExportCache::new(".cache/drawio", Box::new(renderer.clone()))?;
/// assert_eq!(renderer.invocations(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockRenderer {
    behavior: MockBehavior,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::with_behavior(MockBehavior::WriteOutput)
    }
}

impl MockRenderer {
    /// Mock that writes output and succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock with the given behavior.
    #[must_use]
    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Number of times the renderer was invoked.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.lock().requests.len()
    }

    /// All requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RenderRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Renderer for MockRenderer {
    fn invoke(&self, request: RenderRequest) -> io::Result<RenderOutcome> {
        let behavior = self.behavior.clone();
        let output = request.output.clone();
        let body = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\"><!-- {} page {:?} --></svg>",
            request.source.display(),
            request.page_index
        );
        self.lock().requests.push(request);

        match behavior {
            MockBehavior::WriteOutput => {
                if let Some(parent) = output.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&output, body)?;
                Ok(RenderOutcome::success())
            }
            MockBehavior::SucceedWithoutOutput => Ok(RenderOutcome::success()),
            MockBehavior::Fail { code, stderr } => Ok(RenderOutcome {
                status: Some(code),
                stdout: String::new(),
                stderr,
            }),
            MockBehavior::SpawnError => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "mock renderer not found",
            )),
        }
    }
}
