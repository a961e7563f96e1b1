//! Renderer invocation.
//!
//! The cache manager never launches processes directly. It hands a
//! [`RenderRequest`] to a [`Renderer`]; [`CommandRenderer`] is the
//! implementation that runs the Draw.io executable.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Command;

/// One renderer invocation.
///
/// Built by the cache manager and moved into [`Renderer::invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Draw.io executable.
    pub executable: PathBuf,
    /// Diagram source to export.
    pub source: PathBuf,
    /// Page to export; omitted from the command line when `None`.
    pub page_index: Option<u32>,
    /// Output format passed to `--format`.
    pub format: String,
    /// Where the renderer must write the artifact.
    pub output: PathBuf,
    /// Extra arguments appended after the standard ones.
    pub extra_args: Vec<String>,
}

impl RenderRequest {
    /// Command line arguments (without the executable).
    ///
    /// `--export <source> [--page-index <n>] --output <output> --format <format> <extra...>`
    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--export".into(), self.source.clone().into()];
        if let Some(page) = self.page_index {
            args.push("--page-index".into());
            args.push(page.to_string().into());
        }
        args.push("--output".into());
        args.push(self.output.clone().into());
        args.push("--format".into());
        args.push(self.format.clone().into());
        args.extend(self.extra_args.iter().map(OsString::from));
        args
    }
}

/// What the renderer process reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Exit code; `None` if the process was terminated by a signal.
    pub status: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl RenderOutcome {
    /// Outcome of a process that exited with status 0 and printed nothing.
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: Some(0),
            ..Self::default()
        }
    }

    /// True if the process exited with status 0.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Capability to run an export.
///
/// Implementations block until the export finishes. An `Err` means the
/// renderer could not be run at all; a failed export is reported through
/// [`RenderOutcome::status`].
pub trait Renderer: Send + Sync {
    /// Run one export.
    fn invoke(&self, request: RenderRequest) -> io::Result<RenderOutcome>;
}

/// [`Renderer`] that runs the Draw.io executable as a subprocess.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandRenderer;

impl Renderer for CommandRenderer {
    fn invoke(&self, request: RenderRequest) -> io::Result<RenderOutcome> {
        let args = request.args();
        tracing::debug!(
            executable = %request.executable.display(),
            ?args,
            "running export command"
        );

        let output = Command::new(&request.executable).args(&args).output()?;

        Ok(RenderOutcome {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(page_index: Option<u32>) -> RenderRequest {
        RenderRequest {
            executable: PathBuf::from("/opt/draw.io/drawio"),
            source: PathBuf::from("/docs/a.drawio"),
            page_index,
            format: "svg".to_owned(),
            output: PathBuf::from("/cache/a.svg"),
            extra_args: vec!["--no-sandbox".to_owned()],
        }
    }

    #[test]
    fn test_args_with_page() {
        let args = request(Some(2)).args();
        let expected: Vec<OsString> = [
            "--export",
            "/docs/a.drawio",
            "--page-index",
            "2",
            "--output",
            "/cache/a.svg",
            "--format",
            "svg",
            "--no-sandbox",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn test_args_without_page_omit_page_index() {
        let args = request(None).args();
        assert!(!args.iter().any(|a| a == "--page-index"));
        assert_eq!(args.last(), Some(&OsString::from("--no-sandbox")));
    }

    #[test]
    fn test_missing_executable_is_io_error() {
        let mut req = request(None);
        req.executable = PathBuf::from("/definitely/not/a/drawio/binary");
        assert!(CommandRenderer.invoke(req).is_err());
    }
}
