//! Settings loader.
//!
//! Settings come from, in increasing precedence: built-in defaults, the
//! settings file, and `PLANTRACK_*` environment variables (including those
//! loaded from a `.env` file next to the settings file).

use crate::error::{ConfigError, Result, TrackerError};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use super::settings::Settings;

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "PLANTRACK_API_KEY";

/// Environment variable overriding `api.endpoint`.
pub const ENDPOINT_VAR: &str = "PLANTRACK_API_ENDPOINT";

/// Environment variable overriding `track.poll_frequency_ms`.
pub const POLL_FREQUENCY_VAR: &str = "PLANTRACK_POLL_FREQUENCY_MS";

/// Environment variable overriding `track.max_retries`.
pub const MAX_RETRIES_VAR: &str = "PLANTRACK_MAX_RETRIES";

/// Settings file names searched in the working directory and its parents.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["plantrack.yaml", "plantrack.yml"];

/// Loader for tracker settings.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Directory holding the `.env` file.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new settings loader.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory the `.env` file is loaded from.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Settings> {
        let path = path.as_ref();
        info!("Loading settings from: {}", path.display());

        if !path.exists() {
            return Err(TrackerError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses settings from a YAML string. Blank input yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Settings> {
        debug!("Parsing YAML settings");

        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        serde_yaml::from_str(content).map_err(|e| {
            TrackerError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })
    }

    /// Loads settings from a file, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if an
    /// override is not a valid number.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<Settings> {
        let mut settings = self.load_file(path)?;
        apply_overrides(&mut settings, |name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Loads settings from `path`, or from the first settings file found by
    /// [`find_config_file`], or falls back to the defaults.
    ///
    /// The `.env` file is loaded first, from the base path if one was set,
    /// otherwise from the directory of the settings file. Environment
    /// overrides are applied in every case.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `path` does not exist, or if the
    /// `.env` file or the settings cannot be parsed.
    pub fn load(&self, path: Option<&Path>) -> Result<Settings> {
        self.load_from(path, Path::new("."))
    }

    fn load_from(&self, path: Option<&Path>, start_dir: &Path) -> Result<Settings> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| find_config_file(start_dir));

        let env_dir = self
            .base_path
            .clone()
            .or_else(|| {
                path.as_deref()
                    .and_then(Path::parent)
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .map(Path::to_path_buf)
            })
            .unwrap_or_else(|| start_dir.to_path_buf());
        load_dotenv_from(&env_dir)?;

        match path {
            Some(path) => self.load_with_env(path),
            None => {
                debug!("No settings file found, using defaults");
                let mut settings = Settings::default();
                apply_overrides(&mut settings, |name| std::env::var(name).ok())?;
                Ok(settings)
            }
        }
    }

    /// Loads the .env file of the base path (or the working directory) if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        load_dotenv_from(self.base_path.as_deref().unwrap_or_else(|| Path::new(".")))
    }

    /// Gets the API key from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not set or empty.
    pub fn api_key() -> Result<String> {
        std::env::var(API_KEY_VAR)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                TrackerError::Config(ConfigError::MissingEnvVar {
                    name: String::from(API_KEY_VAR),
                })
            })
    }
}

fn load_dotenv_from(dir: &Path) -> Result<()> {
    let env_path = dir.join(".env");

    if env_path.exists() {
        info!("Loading environment from: {}", env_path.display());
        dotenvy::from_path(&env_path).map_err(|e| {
            TrackerError::Config(ConfigError::ParseError {
                message: format!("Failed to load .env file: {e}"),
                location: Some(env_path.display().to_string()),
            })
        })?;
    } else {
        debug!(".env file not found at: {}", env_path.display());
    }

    Ok(())
}

/// Applies `PLANTRACK_*` overrides read through `lookup`.
fn apply_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(endpoint) = lookup(ENDPOINT_VAR) {
        debug!("Overriding api.endpoint from environment");
        settings.api.endpoint = endpoint;
    }

    if let Some(value) = lookup(POLL_FREQUENCY_VAR) {
        debug!("Overriding track.poll_frequency_ms from environment");
        settings.track.poll_frequency_ms = parse_number(POLL_FREQUENCY_VAR, &value)?;
    }

    if let Some(value) = lookup(MAX_RETRIES_VAR) {
        debug!("Overriding track.max_retries from environment");
        settings.track.max_retries = parse_number(MAX_RETRIES_VAR, &value)?;
    }

    Ok(())
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        TrackerError::Config(ConfigError::ParseError {
            message: format!("Invalid value '{value}': {e}"),
            location: Some(name.to_string()),
        })
    })
}

/// Finds the settings file in `start_dir` or its parents, then in the user
/// configuration directory.
#[must_use]
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let start = start_dir.as_ref();
    let start = std::fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());

    find_in_ancestors(&start).or_else(|| {
        dirs::config_dir()
            .map(|dir| dir.join("plantrack").join("config.yaml"))
            .filter(|path| path.exists())
    })
}

fn find_in_ancestors(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found settings file: {}", config_path.display());
                return Some(config_path);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}
