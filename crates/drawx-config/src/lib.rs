//! Configuration management for drawx.
//!
//! Parses `drawx.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `drawio.executable`
//! - `drawio.cache_dir`
//! - `drawio.args` (each entry)

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override docs source directory.
    pub source_dir: Option<PathBuf>,
    /// Override site output directory.
    pub site_dir: Option<PathBuf>,
    /// Override Draw.io executable.
    pub drawio_executable: Option<PathBuf>,
    /// Override export format.
    pub format: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "drawx.toml";

/// Default export format.
const DEFAULT_FORMAT: &str = "svg";

/// Default cache directory, relative to the docs directory.
const DEFAULT_CACHE_DIR: &str = "drawio-exporter";

/// Default markup emitted for each diagram embed.
const DEFAULT_EMBED_FORMAT: &str = r#"<img alt="{img_alt}" src="{img_src}">"#;

/// Default glob identifying diagram sources.
const DEFAULT_SOURCES: &str = "*.drawio";

/// Template placeholder for inlined artifact content.
const CONTENT_PLACEHOLDER: &str = "{content}";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Documentation configuration (paths are relative strings from TOML).
    docs: DocsConfigRaw,
    /// Draw.io export configuration as written in TOML.
    drawio: DrawioConfigRaw,

    /// Resolved docs configuration (set after loading).
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// Resolved Draw.io configuration (set after loading).
    #[serde(skip)]
    pub drawio_resolved: DrawioConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw docs configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    source_dir: Option<String>,
    site_dir: Option<String>,
}

/// Resolved documentation configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Source directory for markdown files and diagrams.
    pub source_dir: PathBuf,
    /// Output directory for the built site.
    pub site_dir: PathBuf,
}

/// Raw Draw.io configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DrawioConfigRaw {
    cache_dir: Option<String>,
    executable: Option<String>,
    args: Option<Vec<String>>,
    format: Option<String>,
    embed_format: Option<String>,
    sources: Option<String>,
}

/// Resolved Draw.io export configuration.
#[derive(Debug)]
pub struct DrawioConfig {
    /// Cache directory as configured; relative paths are resolved against the
    /// docs directory by [`Config::cache_dir`].
    pub cache_dir: PathBuf,
    /// Explicit Draw.io executable; `None` means auto-discovery.
    pub executable: Option<PathBuf>,
    /// Extra arguments appended to every export.
    pub args: Vec<String>,
    /// Output image format.
    pub format: String,
    /// Markup template with `{img_alt}`, `{img_src}` and `{content}` placeholders.
    pub embed_format: String,
    /// Glob matching embed targets that are diagram sources.
    pub sources: String,
}

impl Default for DrawioConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            executable: None,
            args: Vec::new(),
            format: DEFAULT_FORMAT.to_owned(),
            embed_format: DEFAULT_EMBED_FORMAT.to_owned(),
            sources: DEFAULT_SOURCES.to_owned(),
        }
    }
}

impl DrawioConfig {
    /// True if the embed template inlines the exported file.
    #[must_use]
    pub fn inlines_content(&self) -> bool {
        self.embed_format.contains(CONTENT_PLACEHOLDER)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`drawio.executable`").
        field: String,
        /// Error message (e.g., "${`DRAWIO_HOME`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `drawx.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Absolute cache directory.
    ///
    /// A relative `drawio.cache_dir` is based in the docs source directory.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.docs_resolved
            .source_dir
            .join(&self.drawio_resolved.cache_dir)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.docs_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(site_dir) = &settings.site_dir {
            self.docs_resolved.site_dir.clone_from(site_dir);
        }
        if let Some(executable) = &settings.drawio_executable {
            self.drawio_resolved.executable = Some(executable.clone());
        }
        if let Some(format) = &settings.format {
            self.drawio_resolved.format.clone_from(format);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            docs: DocsConfigRaw::default(),
            drawio: DrawioConfigRaw::default(),
            docs_resolved: DocsConfig {
                source_dir: base.join("docs"),
                site_dir: base.join("site"),
            },
            drawio_resolved: DrawioConfig::default(),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let drawio = &self.drawio_resolved;

        require_non_empty(&drawio.format, "drawio.format")?;
        if !drawio.format.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Validation(format!(
                "drawio.format {:?} must be a plain file extension",
                drawio.format
            )));
        }

        require_non_empty(&drawio.sources, "drawio.sources")?;
        if let Err(e) = glob::Pattern::new(&drawio.sources) {
            return Err(ConfigError::Validation(format!(
                "drawio.sources is not a valid glob: {e}"
            )));
        }

        require_non_empty(&drawio.embed_format, "drawio.embed_format")?;
        if drawio.inlines_content() && drawio.format != "svg" {
            return Err(ConfigError::Validation(
                "drawio.embed_format cannot inline {content} of non-SVG format".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let drawio = &mut self.drawio;
        if let Some(ref exe) = drawio.executable {
            drawio.executable = Some(expand::expand_env(exe, "drawio.executable")?);
        }
        if let Some(ref dir) = drawio.cache_dir {
            drawio.cache_dir = Some(expand::expand_env(dir, "drawio.cache_dir")?);
        }
        if let Some(ref mut args) = drawio.args {
            for arg in args.iter_mut() {
                *arg = expand::expand_env(arg, "drawio.args")?;
            }
        }
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.docs_resolved = DocsConfig {
            source_dir: resolve(self.docs.source_dir.as_deref(), "docs"),
            site_dir: resolve(self.docs.site_dir.as_deref(), "site"),
        };

        let raw = &self.drawio;
        let defaults = DrawioConfig::default();
        self.drawio_resolved = DrawioConfig {
            cache_dir: raw.cache_dir.as_ref().map_or(defaults.cache_dir, PathBuf::from),
            // A relative executable is taken relative to the config file.
            executable: raw.executable.as_ref().map(|exe| config_dir.join(exe)),
            args: raw.args.clone().unwrap_or_default(),
            format: raw.format.clone().unwrap_or(defaults.format),
            embed_format: raw.embed_format.clone().unwrap_or(defaults.embed_format),
            sources: raw.sources.clone().unwrap_or(defaults.sources),
        };
    }
}
