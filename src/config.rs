//! Configuration management for termhub.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::session::{Environment, LineEnding, Principal};
use crate::shell::DEFAULT_TIMEOUT_MS;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell engine configuration.
    pub shell: ShellSection,
    /// Initial session environment.
    pub session: SessionSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Shell engine configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSection {
    /// How long one read waits for input, in milliseconds.
    pub read_timeout_ms: i64,
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Session environment section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Owning user's email address.
    pub user: Option<String>,
    /// Locale tag.
    pub locale: String,
    /// Line ending written by `println` (lf, crlf, cr).
    pub line_ending: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            user: None,
            locale: "en".to_string(),
            line_ending: "lf".to_string(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    /// Apply overrides looked up through `var`.
    fn apply_vars<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(timeout) = var("TERMHUB_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse() {
                self.shell.read_timeout_ms = timeout;
            }
        }

        if let Some(user) = var("TERMHUB_USER") {
            if !user.is_empty() {
                self.session.user = Some(user);
            }
        }

        if let Some(locale) = var("TERMHUB_LOCALE") {
            self.session.locale = locale;
        }

        if let Some(level) = var("TERMHUB_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(timeout) = args.timeout_ms {
            self.shell.read_timeout_ms = timeout;
        }

        if let Some(ref user) = args.user {
            self.session.user = Some(user.clone());
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Build the environment new sessions start from.
    pub fn to_environment(&self) -> Result<Environment, ConfigError> {
        let user = match self.session.user {
            Some(ref user) => Some(
                Principal::parse(user)
                    .map_err(|_| ConfigError::InvalidValue("session.user", user.clone()))?,
            ),
            None => None,
        };

        let line_ending: LineEnding = self.session.line_ending.parse().map_err(|_| {
            ConfigError::InvalidValue("session.line_ending", self.session.line_ending.clone())
        })?;

        let environment = Environment::new().with_user(user);
        environment.set_locale(&self.session.locale);
        environment.set_line_ending(line_ending);
        Ok(environment)
    }

    /// The configured owner, if any and well formed.
    pub fn user(&self) -> Option<Principal> {
        self.session
            .user
            .as_deref()
            .and_then(|user| Principal::parse(user).ok())
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file: {0}")]
    Io(std::io::Error),
    /// JSON parsing error.
    #[error("failed to parse config file: {0}")]
    Json(serde_json::Error),
    /// A setting that does not parse.
    #[error("invalid value for {0}: '{1}'")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.shell.read_timeout_ms, 50);
        assert_eq!(config.session.user, None);
        assert_eq!(config.session.locale, "en");
        assert_eq!(config.session.line_ending, "lf");
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "shell": { "read_timeout_ms": 200 },
            "session": {
                "user": "alice@example.com",
                "locale": "fr",
                "line_ending": "crlf"
            }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.shell.read_timeout_ms, 200);
        assert_eq!(config.session.user.as_deref(), Some("alice@example.com"));
        assert_eq!(config.session.locale, "fr");
        assert_eq!(config.session.line_ending, "crlf");
        assert_eq!(config.logging.level, "info"); // default
    }

    #[test]
    fn test_config_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_config_missing_file() {
        let err = Config::from_file(Path::new("/nonexistent/termhub.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_apply_vars() {
        let mut config = Config::default();
        config.apply_vars(vars(&[
            ("TERMHUB_TIMEOUT_MS", "75"),
            ("TERMHUB_USER", "bob@example.com"),
            ("TERMHUB_LOCALE", "de"),
            ("RUST_LOG", "trace"),
        ]));

        assert_eq!(config.shell.read_timeout_ms, 75);
        assert_eq!(config.session.user.as_deref(), Some("bob@example.com"));
        assert_eq!(config.session.locale, "de");
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_apply_vars_log_level_beats_rust_log() {
        let mut config = Config::default();
        config.apply_vars(vars(&[("TERMHUB_LOG_LEVEL", "warn"), ("RUST_LOG", "trace")]));
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_apply_vars_ignores_garbage_timeout() {
        let mut config = Config::default();
        config.apply_vars(vars(&[("TERMHUB_TIMEOUT_MS", "soon"), ("TERMHUB_USER", "")]));
        assert_eq!(config.shell.read_timeout_ms, 50);
        assert_eq!(config.session.user, None);
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            timeout_ms: Some(10),
            user: Some("carol@example.com".to_string()),
            log_level: Some("debug".to_string()),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.shell.read_timeout_ms, 10);
        assert_eq!(config.session.user.as_deref(), Some("carol@example.com"));
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_to_environment() {
        let mut config = Config::default();
        config.session.user = Some("alice@example.com".to_string());
        config.session.locale = "fr".to_string();
        config.session.line_ending = "cr".to_string();

        let environment = config.to_environment().unwrap();
        assert_eq!(
            environment.user().map(|u| u.to_string()).as_deref(),
            Some("alice@example.com")
        );
        assert_eq!(environment.locale(), "fr");
        assert_eq!(environment.line_ending(), LineEnding::Cr);
        assert_eq!(config.user(), environment.user());
    }

    #[test]
    fn test_to_environment_invalid_values() {
        let mut config = Config::default();
        config.session.user = Some("nobody".to_string());
        assert!(matches!(
            config.to_environment(),
            Err(ConfigError::InvalidValue("session.user", _))
        ));

        let mut config = Config::default();
        config.session.line_ending = "lfcr".to_string();
        assert!(matches!(
            config.to_environment(),
            Err(ConfigError::InvalidValue("session.line_ending", _))
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"read_timeout_ms\""));
        assert!(json.contains("\"line_ending\""));
    }
}
