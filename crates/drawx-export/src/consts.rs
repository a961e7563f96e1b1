//! Internal constants for diagram export.

/// Suffix identifying Draw.io sources in embed URLs.
pub const DEFAULT_SOURCE_SUFFIX: &str = ".drawio";

/// Image format requested from the renderer when none is configured.
pub const DEFAULT_FORMAT: &str = "svg";

/// Executable names searched on `PATH`.
pub const EXECUTABLE_NAMES: &[&str] = &["drawio", "draw.io"];

/// Number of hex digits of the source path digest kept in cache file names.
pub(crate) const KEY_DIGEST_LEN: usize = 16;
