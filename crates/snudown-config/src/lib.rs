//! Configuration for the snudown renderer.
//!
//! Parses `snudown.toml` with serde. The file carries per-call render
//! defaults, the nesting ceiling and an optional static user directory:
//!
//! ```toml
//! [render]
//! nofollow = true
//! target = "_blank"
//! domain = "${SITE_DOMAIN:-example.com}"
//! toc_id_prefix = "md-"
//! surface = "wiki"
//! enable_toc = true
//!
//! [limits]
//! max_nesting = 16
//! fail_on_depth_exceeded = false
//!
//! [users]
//! alice = "Alice Liddell"
//! ```
//!
//! ## Environment Variable Expansion
//!
//! `render.target`, `render.domain` and `render.toc_id_prefix` support
//! `${VAR}` and `${VAR:-default}`.

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "snudown.toml";

/// Nesting ceiling used when the file does not set one.
pub const DEFAULT_MAX_NESTING: usize = 16;

/// Largest accepted nesting ceiling.
const MAX_NESTING_LIMIT: usize = 256;

/// Renderer configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Defaults applied to render requests built from this config.
    pub render: RenderDefaults,
    /// Structural limits.
    pub limits: LimitsConfig,
    /// Static user directory: username to display name.
    pub users: BTreeMap<String, String>,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Content surface named in the config file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceSetting {
    /// Free-form user text.
    #[default]
    Usertext,
    /// Curated wiki pages.
    Wiki,
}

/// Per-call render defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Emit `rel="nofollow"` on links.
    pub nofollow: bool,
    /// Value of the `target` attribute on links.
    pub target: Option<String>,
    /// Domain whose links keep opening in the same window when `target` is `_blank`.
    pub domain: Option<String>,
    /// Prefix for heading ids shared by the TOC and the document.
    pub toc_id_prefix: Option<String>,
    /// Surface used when the caller does not pick one.
    pub surface: SurfaceSetting,
    /// Produce a table of contents.
    pub enable_toc: bool,
}

/// Structural limits.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum block/inline nesting honored by the renderer.
    pub max_nesting: usize,
    /// Fail the render instead of flattening content past `max_nesting`.
    pub fail_on_depth_exceeded: bool,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_nesting: DEFAULT_MAX_NESTING,
            fail_on_depth_exceeded: false,
        }
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
        /// Config field path (e.g., "`render.domain`").
        field: String,
        /// Error message (e.g., "${`SITE_DOMAIN`} not set").
        message: String,
    },
}

/// Require an optional string field to be non-empty when present.
fn require_non_empty(value: Option<&str>, field: &str) -> Result<(), ConfigError> {
    if value.is_some_and(str::is_empty) {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `snudown.toml` in the current directory and its parents, falling
    /// back to defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, or if reading,
    /// parsing, expansion or validation fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }

        match Self::discover_config() {
            Some(discovered) => Self::load_from_file(&discovered),
            None => Ok(Self::default()),
        }
    }

    /// Parse, expand and validate configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns error if parsing, expansion or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically by [`load`](Self::load) and
    /// [`from_toml_str`](Self::from_toml_str).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_render()?;
        self.validate_limits()?;
        Ok(())
    }

    fn validate_render(&self) -> Result<(), ConfigError> {
        let render = &self.render;
        require_non_empty(render.target.as_deref(), "render.target")?;
        require_non_empty(render.domain.as_deref(), "render.domain")?;

        // Prefix ends up inside id="..." and href="#..."
        if let Some(prefix) = &render.toc_id_prefix
            && !prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        {
            return Err(ConfigError::Validation(format!(
                "render.toc_id_prefix contains characters not allowed in an id: {prefix:?}"
            )));
        }

        Ok(())
    }

    fn validate_limits(&self) -> Result<(), ConfigError> {
        let max = self.limits.max_nesting;
        if max == 0 {
            return Err(ConfigError::Validation(
                "limits.max_nesting must be greater than 0".to_owned(),
            ));
        }
        if max > MAX_NESTING_LIMIT {
            return Err(ConfigError::Validation(format!(
                "limits.max_nesting cannot exceed {MAX_NESTING_LIMIT}"
            )));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        expand::expand_opt(&mut self.render.target, "render.target")?;
        expand::expand_opt(&mut self.render.domain, "render.domain")?;
        expand::expand_opt(&mut self.render.toc_id_prefix, "render.toc_id_prefix")?;
        Ok(())
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

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }
}
