//! Configuration loading and validation.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Port used when neither the CLI, the environment, nor the config file sets one.
pub const DEFAULT_PORT: u16 = 3000;

/// Environment variable consulted for the listen port.
pub const PORT_ENV: &str = "PORT";

/// Top-level Splitboard configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address (default: 0.0.0.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    /// Directory of static presentation assets (default: "docs").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "splitboard_gateway=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: None,
            filters: Vec::new(),
            output: default_log_output(),
        }
    }
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

static ENV_VAR_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(crate::error::SplitboardError::Io)?;

        let substituted = substitute_env_vars(&raw);

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| crate::error::SplitboardError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Default config file location.
    pub fn config_path() -> PathBuf {
        data_dir().join("config.json")
    }

    /// Port from the config file, or the default.
    pub fn port(&self) -> u16 {
        self.server.as_ref().map(|s| s.port).unwrap_or(DEFAULT_PORT)
    }

    /// Effective listen port: CLI flag, then `$PORT`, then the config file.
    pub fn resolve_port(&self, cli_port: Option<u16>) -> u16 {
        let env_port = std::env::var(PORT_ENV).ok();
        self.resolve_port_with(cli_port, env_port.as_deref())
    }

    fn resolve_port_with(&self, cli_port: Option<u16>, env_port: Option<&str>) -> u16 {
        if let Some(port) = cli_port {
            return port;
        }
        if let Some(raw) = env_port.map(str::trim).filter(|s| !s.is_empty()) {
            match raw.parse::<u16>() {
                Ok(port) => return port,
                Err(_) => tracing::warn!(value = raw, "Ignoring unparseable {PORT_ENV}"),
            }
        }
        self.port()
    }

    pub fn bind_addr(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string())
    }

    /// Static asset directory, with `~` expanded.
    pub fn static_dir(&self) -> PathBuf {
        let raw = self
            .server
            .as_ref()
            .and_then(|s| s.static_dir.as_deref())
            .unwrap_or("docs");
        PathBuf::from(shellexpand::tilde(raw).as_ref())
    }

    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Validate the configuration against the resolved listen `port`,
    /// returning `(warnings, errors)`.
    ///
    /// The port is checked after precedence is applied, so a file port that a
    /// flag or `$PORT` overrides is never reported.
    pub fn validate(&self, port: u16) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if port == 0 {
            errors.push("Server port cannot be 0".to_string());
        }

        let static_dir = self.static_dir();
        if !static_dir.is_dir() {
            warnings.push(format!(
                "Static directory not found: {}",
                static_dir.display()
            ));
        }

        if let Some(logging) = &self.logging {
            if !matches!(logging.format.as_str(), "plain" | "json") {
                errors.push(format!("Unknown log format: {}", logging.format));
            }
            if !matches!(logging.output.as_str(), "stderr" | "stdout") {
                errors.push(format!("Unknown log output: {}", logging.output));
            }
        }

        (warnings, errors)
    }
}

/// Base directory for Splitboard data: `~/.splitboard/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".splitboard")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_port(port: u16) -> Config {
        Config {
            server: Some(ServerConfig {
                port,
                bind: None,
                static_dir: None,
            }),
            ..Config::default()
        }
    }

    #[test]
    fn test_env_var_substitution() {
        // SAFETY: test-only, variable name unique to this test
        unsafe { std::env::set_var("TEST_SB_BIND", "127.0.0.1") };
        let input = r#"{"bind": "${TEST_SB_BIND}", "other": "plain"}"#;
        let result = substitute_env_vars(input);
        assert!(result.contains("127.0.0.1"));
        assert!(result.contains("plain"));
        unsafe { std::env::remove_var("TEST_SB_BIND") };
    }

    #[test]
    fn test_env_var_missing() {
        let input = r#"{"key": "${NONEXISTENT_VAR_SB_TEST}"}"#;
        let result = substitute_env_vars(input);
        assert!(result.contains(r#""""#));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.bind_addr(), "0.0.0.0");
        assert_eq!(config.static_dir(), PathBuf::from("docs"));
    }

    #[test]
    fn test_port_precedence() {
        let config = config_with_port(8080);
        assert_eq!(config.resolve_port_with(Some(9000), Some("7000")), 9000);
        assert_eq!(config.resolve_port_with(None, Some("7000")), 7000);
        assert_eq!(config.resolve_port_with(None, None), 8080);
        assert_eq!(Config::default().resolve_port_with(None, None), DEFAULT_PORT);
    }

    #[test]
    fn test_bad_port_env_falls_back() {
        let config = config_with_port(8080);
        assert_eq!(config.resolve_port_with(None, Some("not-a-port")), 8080);
        assert_eq!(config.resolve_port_with(None, Some("  ")), 8080);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.json")).unwrap();
        assert!(config.server.is_none());
        assert_eq!(config.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_load_json5_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                // comments are allowed
                server: { port: 4100, static_dir: "public" },
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.port(), 4100);
        assert_eq!(config.static_dir(), PathBuf::from("public"));
    }

    #[test]
    fn test_load_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ server: ").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, crate::error::SplitboardError::Config(_)));
    }

    #[test]
    fn test_logging_config_defaults() {
        let json_str = r#"{ "logging": {} }"#;
        let config: Config = json5::from_str(json_str).unwrap();
        let logging = config.logging.expect("logging should be present");
        assert_eq!(logging.format, "plain");
        assert!(logging.level.is_none());
        assert_eq!(logging.output, "stderr");
        assert!(logging.filters.is_empty());
    }

    #[test]
    fn test_validate_zero_port_errors() {
        let config = config_with_port(0);
        let (_warnings, errors) = config.validate(config.resolve_port_with(None, None));
        assert!(
            errors.iter().any(|e| e.contains("port")),
            "Expected a port error, got: {errors:?}"
        );
    }

    #[test]
    fn test_flag_overrides_zero_file_port() {
        let config = config_with_port(0);
        let port = config.resolve_port_with(Some(4000), None);
        assert_eq!(port, 4000);

        let (_warnings, errors) = config.validate(port);
        assert!(errors.is_empty(), "Unexpected errors: {errors:?}");
    }

    #[test]
    fn test_zero_port_from_env_or_flag_errors() {
        let config = config_with_port(8080);
        for port in [
            config.resolve_port_with(None, Some("0")),
            config.resolve_port_with(Some(0), None),
        ] {
            let (_warnings, errors) = config.validate(port);
            assert!(errors.iter().any(|e| e.contains("port")));
        }
    }

    #[test]
    fn test_validate_missing_static_dir_warns() {
        let config = Config {
            server: Some(ServerConfig {
                port: 3000,
                bind: None,
                static_dir: Some("/nonexistent/splitboard/docs".into()),
            }),
            ..Config::default()
        };
        let (warnings, errors) = config.validate(config.port());
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.contains("Static directory")));
    }

    #[test]
    fn test_validate_unknown_log_format() {
        let config = Config {
            logging: Some(LoggingConfig {
                format: "xml".into(),
                ..LoggingConfig::default()
            }),
            ..Config::default()
        };
        let (_warnings, errors) = config.validate(config.port());
        assert!(errors.iter().any(|e| e.contains("xml")));
    }
}
