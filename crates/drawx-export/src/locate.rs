//! Draw.io executable discovery.
//!
//! An explicitly configured executable always wins. Otherwise an
//! [`ExecutableLocator`] is asked; [`SystemLocator`] searches `PATH` and the
//! default install locations of the current platform.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::consts::EXECUTABLE_NAMES;
use crate::error::ExportError;

/// Strategy for finding the Draw.io executable.
pub trait ExecutableLocator: Send + Sync {
    /// Absolute path of the executable, or `None` if it cannot be found.
    fn locate(&self) -> Option<PathBuf>;
}

/// Locator that always answers with a fixed path (or nothing).
#[derive(Debug, Clone, Default)]
pub struct FixedLocator(pub Option<PathBuf>);

impl ExecutableLocator for FixedLocator {
    fn locate(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}

/// Searches `PATH` for known executable names, then platform install paths.
#[derive(Debug, Clone)]
pub struct SystemLocator {
    names: Vec<String>,
    search_path: Option<OsString>,
    candidates: Vec<PathBuf>,
}

impl SystemLocator {
    /// Locator for the platform this binary was built for, using `PATH`.
    #[must_use]
    pub fn for_current_platform() -> Self {
        Self {
            names: EXECUTABLE_NAMES.iter().map(|&n| n.to_owned()).collect(),
            search_path: std::env::var_os("PATH"),
            candidates: platform_candidates(std::env::consts::OS),
        }
    }

    /// Locator with explicit names, search path and candidate paths.
    #[must_use]
    pub fn new(
        names: Vec<String>,
        search_path: Option<OsString>,
        candidates: Vec<PathBuf>,
    ) -> Self {
        Self {
            names,
            search_path,
            candidates,
        }
    }

    fn search_path(&self) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref()?;
        for name in &self.names {
            for dir in std::env::split_paths(search_path) {
                for file_name in executable_file_names(name) {
                    let candidate = dir.join(&file_name);
                    if candidate.is_file() {
                        tracing::debug!(
                            "found Draw.io executable {name:?} at {}",
                            candidate.display()
                        );
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }
}

impl ExecutableLocator for SystemLocator {
    fn locate(&self) -> Option<PathBuf> {
        if let Some(found) = self.search_path() {
            return Some(found);
        }

        tracing::debug!("trying platform paths {:?}", self.candidates);
        self.candidates.iter().find(|c| c.is_file()).map(|c| {
            tracing::debug!("found Draw.io executable at {}", c.display());
            c.clone()
        })
    }
}

#[cfg(windows)]
fn executable_file_names(name: &str) -> Vec<String> {
    vec![format!("{name}.exe"), name.to_owned()]
}

#[cfg(not(windows))]
fn executable_file_names(name: &str) -> Vec<String> {
    vec![name.to_owned()]
}

/// Default install locations for `os` (as in `std::env::consts::OS`).
#[must_use]
pub fn platform_candidates(os: &str) -> Vec<PathBuf> {
    match os {
        "macos" => {
            let app = Path::new("draw.io.app")
                .join("Contents")
                .join("MacOS")
                .join("draw.io");
            [shellexpand::tilde("~/Applications").into_owned(), "/Applications".to_owned()]
                .into_iter()
                .map(|dir| PathBuf::from(dir).join(&app))
                .collect()
        }
        "linux" => vec![PathBuf::from("/opt/draw.io/drawio")],
        "windows" => ["ProgramFiles", "ProgramFiles(x86)"]
            .into_iter()
            .filter_map(std::env::var_os)
            .map(|dir| PathBuf::from(dir).join("draw.io").join("draw.io.exe"))
            .collect(),
        other => {
            tracing::warn!("Draw.io executable paths not known for platform {other:?}");
            Vec::new()
        }
    }
}

/// Pick the executable to use for exports.
///
/// A configured path must point to an existing file. Without one, the
/// locator is consulted.
pub fn resolve_executable(
    configured: Option<&Path>,
    locator: &dyn ExecutableLocator,
) -> Result<PathBuf, ExportError> {
    if let Some(path) = configured {
        if !path.is_file() {
            return Err(ExportError::ExecutableNotFound(format!(
                "{} didn't exist; fix drawio.executable",
                path.display()
            )));
        }
        return Ok(path.to_path_buf());
    }

    locator.locate().ok_or_else(|| {
        ExportError::ExecutableNotFound(
            "unable to find Draw.io; ensure it's on PATH or set drawio.executable".to_owned(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_configured_executable_must_exist() {
        let err = resolve_executable(
            Some(Path::new("/does/not/exist/drawio")),
            &FixedLocator(Some(PathBuf::from("/elsewhere/drawio"))),
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::ExecutableNotFound(_)));
        assert!(err.to_string().contains("/does/not/exist/drawio"));
    }

    #[test]
    fn test_configured_executable_wins() {
        let tmp = TempDir::new().unwrap();
        let exe = tmp.path().join("drawio");
        touch(&exe);

        let resolved =
            resolve_executable(Some(&exe), &FixedLocator(Some(PathBuf::from("/other")))).unwrap();
        assert_eq!(resolved, exe);
    }

    #[test]
    fn test_falls_back_to_locator() {
        let resolved =
            resolve_executable(None, &FixedLocator(Some(PathBuf::from("/opt/drawio")))).unwrap();
        assert_eq!(resolved, PathBuf::from("/opt/drawio"));
    }

    #[test]
    fn test_nothing_found_gives_guidance() {
        let err = resolve_executable(None, &FixedLocator(None)).unwrap_err();
        assert!(err.to_string().contains("drawio.executable"));
    }

    #[test]
    fn test_system_locator_searches_path_in_name_order() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        let exe = bin.join(executable_file_names("draw.io").remove(0));
        touch(&exe);

        let locator = SystemLocator::new(
            vec!["drawio".to_owned(), "draw.io".to_owned()],
            Some(bin.into_os_string()),
            Vec::new(),
        );
        assert_eq!(locator.locate(), Some(exe));
    }

    #[test]
    fn test_system_locator_uses_platform_candidates() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing/drawio");
        let present = tmp.path().join("opt/someotherdrawio");
        touch(&present);

        let locator = SystemLocator::new(
            vec!["drawio".to_owned()],
            None,
            vec![missing, present.clone()],
        );
        assert_eq!(locator.locate(), Some(present));
    }

    #[test]
    fn test_system_locator_finds_nothing() {
        let locator = SystemLocator::new(Vec::new(), None, Vec::new());
        assert_eq!(locator.locate(), None);
    }

    #[test]
    fn test_platform_candidates() {
        assert_eq!(
            platform_candidates("linux"),
            vec![PathBuf::from("/opt/draw.io/drawio")]
        );
        let mac = platform_candidates("macos");
        assert_eq!(mac.len(), 2);
        assert!(mac.iter().all(|p| p.ends_with("draw.io.app/Contents/MacOS/draw.io")));
        assert!(platform_candidates("plan9").is_empty());
    }
}
