//! Configuration management for RW.
//!
//! Parses `rw.toml` configuration files with serde and provides
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
//! - `vcs.endpoint`
//! - `vcs.token`
//! - `vcs.owner`
//! - `vcs.repo`
//! - every value in `[vars]`

mod expand;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override docs source directory.
    pub source_dir: Option<PathBuf>,
    /// Override build output directory.
    pub output_dir: Option<PathBuf>,
    /// Override output format.
    pub output_format: Option<OutputFormat>,
    /// Override single page bundle generation.
    pub single_page: Option<bool>,
    /// Override contributor attribution.
    pub contributors: Option<bool>,
    /// Override condition filtering of leading pages.
    pub resolve_conditions: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "rw.toml";

/// Default GitHub REST API endpoint.
const DEFAULT_VCS_ENDPOINT: &str = "https://api.github.com";

/// Format of the generated documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Processed markdown (variables and conditions resolved).
    #[default]
    Md,
    /// Standalone HTML fragments.
    Html,
}

impl OutputFormat {
    /// File extension of generated documents, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Md => "md",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "md" => Ok(Self::Md),
            "html" => Ok(Self::Html),
            other => Err(format!("unknown output format '{other}' (expected md or html)")),
        }
    }
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build configuration (paths are relative strings from TOML).
    build: BuildConfigRaw,
    /// Variables available to templates in every page.
    pub vars: BTreeMap<String, String>,
    /// Version control connection used for contributor attribution.
    pub vcs: Option<VcsConfig>,

    /// Resolved build configuration (set after loading).
    #[serde(skip)]
    pub build_resolved: BuildConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw build configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BuildConfigRaw {
    source_dir: Option<String>,
    output_dir: Option<String>,
    output_format: Option<OutputFormat>,
    single_page: Option<bool>,
    contributors: Option<bool>,
    resolve_conditions: Option<bool>,
    toc: Option<String>,
}

/// Resolved build configuration with absolute paths.
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    /// Source directory for markdown files.
    pub source_dir: PathBuf,
    /// Directory that receives the generated tree.
    pub output_dir: PathBuf,
    /// Format of generated documents.
    pub output_format: OutputFormat,
    /// Whether per-section single page bundles are generated.
    pub single_page: bool,
    /// Whether pages are stamped with their contributors.
    pub contributors: bool,
    /// Whether `when` conditions of leading pages (`index.yaml`) are resolved
    /// in markdown output. HTML output always resolves them.
    pub resolve_conditions: bool,
    /// Navigation file name, looked up in the source directory.
    pub toc_filename: String,
}

/// Version control configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VcsConfig {
    /// REST API endpoint.
    #[serde(default = "default_vcs_endpoint")]
    pub endpoint: String,
    /// API access token.
    #[serde(default)]
    pub token: String,
    /// Repository owner (user or organization).
    #[serde(default)]
    pub owner: String,
    /// Repository name.
    #[serde(default)]
    pub repo: String,
    /// Directory of the docs source inside the repository.
    #[serde(default)]
    pub path_prefix: String,
}

impl VcsConfig {
    /// Validate that all required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any field is empty or has invalid format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.endpoint, "vcs.endpoint")?;
        require_http_url(&self.endpoint, "vcs.endpoint")?;
        require_non_empty(&self.token, "vcs.token")?;
        require_non_empty(&self.owner, "vcs.owner")?;
        require_non_empty(&self.repo, "vcs.repo")?;
        Ok(())
    }
}

fn default_vcs_endpoint() -> String {
    DEFAULT_VCS_ENDPOINT.to_owned()
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
        /// Config field path (e.g., "`vcs.token`").
        field: String,
        /// Error message (e.g., "${`GITHUB_TOKEN`} not set").
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

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `rw.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. Validation runs
    /// last, so a feature switched on from the command line is checked too.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
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
        }

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.build_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.build_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(output_format) = settings.output_format {
            self.build_resolved.output_format = output_format;
        }
        if let Some(single_page) = settings.single_page {
            self.build_resolved.single_page = single_page;
        }
        if let Some(contributors) = settings.contributors {
            self.build_resolved.contributors = contributors;
        }
        if let Some(resolve_conditions) = settings.resolve_conditions {
            self.build_resolved.resolve_conditions = resolve_conditions;
        }
    }

    /// Get validated version control configuration.
    ///
    /// Use this instead of accessing the `vcs` field directly when the
    /// command requires a repository connection.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or invalid.
    pub fn require_vcs(&self) -> Result<&VcsConfig, ConfigError> {
        let vcs = self.vcs.as_ref().ok_or_else(|| {
            ConfigError::Validation(
                "[vcs] section required when contributors are enabled".into(),
            )
        })?;
        vcs.validate()?;
        Ok(vcs)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.build_resolved.toc_filename, "build.toc")?;
        if self.build_resolved.contributors {
            self.require_vcs()?;
        }
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

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            build: BuildConfigRaw::default(),
            vars: BTreeMap::new(),
            vcs: None,
            build_resolved: BuildConfig {
                source_dir: base.join("docs"),
                output_dir: base.join(".rw/build"),
                output_format: OutputFormat::Md,
                single_page: false,
                contributors: false,
                resolve_conditions: false,
                toc_filename: "toc.yaml".to_owned(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref mut vcs) = self.vcs {
            vcs.endpoint = expand::expand_env(&vcs.endpoint, "vcs.endpoint")?;
            vcs.token = expand::expand_env(&vcs.token, "vcs.token")?;
            vcs.owner = expand::expand_env(&vcs.owner, "vcs.owner")?;
            vcs.repo = expand::expand_env(&vcs.repo, "vcs.repo")?;
        }

        for (name, value) in &mut self.vars {
            *value = expand::expand_env(value, &format!("vars.{name}"))?;
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.build_resolved = BuildConfig {
            source_dir: resolve(self.build.source_dir.as_deref(), "docs"),
            output_dir: resolve(self.build.output_dir.as_deref(), ".rw/build"),
            output_format: self.build.output_format.unwrap_or_default(),
            single_page: self.build.single_page.unwrap_or(false),
            contributors: self.build.contributors.unwrap_or(false),
            resolve_conditions: self.build.resolve_conditions.unwrap_or(false),
            toc_filename: self
                .build
                .toc
                .clone()
                .unwrap_or_else(|| "toc.yaml".to_owned()),
        };
    }
}
