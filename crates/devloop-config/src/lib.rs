//! Configuration management for devloop.
//!
//! Parses `devloop.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. Without a config
//! file, the defaults describe a project with sources in `src/`, static
//! assets in `static/`, and bundled output in `dist/`, served on
//! `0.0.0.0:8432`.
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
//! - `server.host`
//! - `bundle.command`
//! - `check.command`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "devloop.toml";

/// Default polling interval of the rebuild loop.
const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Watch configuration (paths are relative strings from TOML).
    watch: WatchConfigRaw,
    /// Output configuration (paths are relative strings from TOML).
    output: OutputConfigRaw,
    /// Bundler invocation.
    pub bundle: BundleConfig,
    /// Type-checker invocation.
    pub check: CheckConfig,

    /// Resolved watch configuration (set after loading).
    #[serde(skip)]
    pub watch_resolved: WatchConfig,
    /// Resolved build output directory (set after loading).
    #[serde(skip)]
    pub output_dir: PathBuf,
    /// Directory the bundler and checker run in (set after loading).
    #[serde(skip)]
    pub project_dir: PathBuf,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8432,
        }
    }
}

/// Raw watch configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WatchConfigRaw {
    paths: Option<Vec<String>>,
    poll_interval_ms: Option<u64>,
}

/// Resolved watch configuration with absolute paths.
#[derive(Debug)]
pub struct WatchConfig {
    /// Directory roots observed for changes.
    pub paths: Vec<PathBuf>,
    /// Interval between rebuild loop ticks.
    pub poll_interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Raw output configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputConfigRaw {
    dir: Option<String>,
}

/// Bundler command configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Program and arguments producing the build output.
    pub command: Vec<String>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            command: ["deno", "run", "-A", "bundle.ts"]
                .map(str::to_owned)
                .to_vec(),
        }
    }
}

/// Type-checker command configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Whether the check step runs at all.
    pub enabled: bool,
    /// Program and arguments performing the check.
    pub command: Vec<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: ["deno", "check", "src"].map(str::to_owned).to_vec(),
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
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`DEV_HOST`} not set").
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

/// Require a command to name a program.
fn require_command(command: &[String], field: &str) -> Result<(), ConfigError> {
    match command.first() {
        Some(program) if !program.is_empty() => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "{field} must name a program"
        ))),
    }
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `devloop.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
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

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
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
        let mut config = Self {
            server: ServerConfig::default(),
            watch: WatchConfigRaw::default(),
            output: OutputConfigRaw::default(),
            bundle: BundleConfig::default(),
            check: CheckConfig::default(),
            watch_resolved: WatchConfig::default(),
            output_dir: PathBuf::new(),
            project_dir: PathBuf::new(),
            config_path: None,
        };
        config.resolve_paths(base);
        config
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before validation
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_watch()?;
        require_command(&self.bundle.command, "bundle.command")?;
        if self.check.enabled {
            require_command(&self.check.command, "check.command")?;
        }
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 would bind a random port the browser cannot guess
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate watch configuration.
    fn validate_watch(&self) -> Result<(), ConfigError> {
        const MIN_POLL_MS: u128 = 10;
        const MAX_POLL_MS: u128 = 60_000;

        if self.watch_resolved.paths.is_empty() {
            return Err(ConfigError::Validation(
                "watch.paths must contain at least one directory".to_owned(),
            ));
        }

        let poll_ms = self.watch_resolved.poll_interval.as_millis();
        if !(MIN_POLL_MS..=MAX_POLL_MS).contains(&poll_ms) {
            return Err(ConfigError::Validation(format!(
                "watch.poll_interval_ms must be between {MIN_POLL_MS} and {MAX_POLL_MS}"
            )));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        self.bundle.command = expand::expand_env_all(&self.bundle.command, "bundle.command")?;
        self.check.command = expand::expand_env_all(&self.check.command, "check.command")?;
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let paths = match &self.watch.paths {
            Some(paths) => paths.iter().map(|p| config_dir.join(p)).collect(),
            None => vec![config_dir.join("src"), config_dir.join("static")],
        };

        self.watch_resolved = WatchConfig {
            paths,
            poll_interval: Duration::from_millis(
                self.watch.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
        };
        self.output_dir = config_dir.join(self.output.dir.as_deref().unwrap_or("dist"));
        self.project_dir = config_dir.to_path_buf();
    }
}
