use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT_URL: &str = "http://127.0.0.1:8000/ask";
pub const DEFAULT_GREETING: &str = "Hi there! What can I help you with?";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "no API key configured (set `api_key` in the config file, TECHMATE_API_KEY, or --api-key)"
    )]
    MissingApiKey,

    #[error("invalid endpoint URL {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("malformed config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Raw configuration as written in `config.json` or supplied on the command line.
///
/// Every field is optional; [`Config::resolve`] fills defaults and rejects
/// what cannot be defaulted.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub endpoint_url: Option<String>,
    pub api_key: Option<String>,
    pub use_llm: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub greeting: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load the config file from the default location.
    ///
    /// A missing file yields an empty config.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load a config file that must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config_content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&config_content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("techmate").join("config.json"))
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn overlay(self, other: Config) -> Self {
        Self {
            endpoint_url: other.endpoint_url.or(self.endpoint_url),
            api_key: other.api_key.or(self.api_key),
            use_llm: other.use_llm.or(self.use_llm),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            greeting: other.greeting.or(self.greeting),
            log_level: other.log_level.or(self.log_level),
        }
    }

    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let raw_url = self
            .endpoint_url
            .unwrap_or_else(|| DEFAULT_ENDPOINT_URL.to_string());
        let endpoint_url = parse_endpoint(&raw_url)?;

        let api_key = self
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let timeout_secs = self
            .timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        // An explicitly empty greeting turns it off.
        let greeting = match self.greeting {
            Some(g) if g.trim().is_empty() => None,
            Some(g) => Some(g),
            None => Some(DEFAULT_GREETING.to_string()),
        };

        Ok(Settings {
            backend: BackendConfig {
                endpoint_url,
                api_key,
                use_llm: self.use_llm.unwrap_or(true),
                timeout: Duration::from_secs(timeout_secs),
            },
            greeting,
            log_level: self
                .log_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidEndpoint {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidEndpoint {
            url: raw.to_string(),
            reason: format!("unsupported scheme `{other}`"),
        }),
    }
}

/// Fully resolved startup settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: BackendConfig,
    pub greeting: Option<String>,
    pub log_level: String,
}

#[derive(Clone)]
pub struct BackendConfig {
    pub endpoint_url: Url,
    pub api_key: String,
    pub use_llm: bool,
    pub timeout: Duration,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("endpoint_url", &self.endpoint_url.as_str())
            .field("api_key", &"<redacted>")
            .field("use_llm", &self.use_llm)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn with_key() -> Config {
        Config {
            api_key: Some("secret".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn resolve_fills_defaults() {
        let settings = with_key().resolve().unwrap();
        assert_eq!(settings.backend.endpoint_url.as_str(), DEFAULT_ENDPOINT_URL);
        assert_eq!(settings.backend.api_key, "secret");
        assert!(settings.backend.use_llm);
        assert_eq!(settings.backend.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(settings.greeting.as_deref(), Some(DEFAULT_GREETING));
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn missing_or_blank_api_key_is_rejected() {
        assert!(matches!(
            Config::default().resolve(),
            Err(ConfigError::MissingApiKey)
        ));

        let blank = Config {
            api_key: Some("   ".to_string()),
            ..Config::default()
        };
        assert!(matches!(blank.resolve(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn invalid_endpoints_are_rejected() {
        for url in ["not a url", "ftp://example.com/ask"] {
            let config = Config {
                endpoint_url: Some(url.to_string()),
                ..with_key()
            };
            assert!(
                matches!(config.resolve(), Err(ConfigError::InvalidEndpoint { .. })),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn blank_greeting_disables_it() {
        let config = Config {
            greeting: Some(String::new()),
            ..with_key()
        };
        assert_eq!(config.resolve().unwrap().greeting, None);
    }

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let config = Config {
            timeout_secs: Some(0),
            ..with_key()
        };
        assert_eq!(
            config.resolve().unwrap().backend.timeout,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn overlay_prefers_the_upper_layer() {
        let file = Config {
            endpoint_url: Some("http://file.example/ask".to_string()),
            api_key: Some("file-key".to_string()),
            use_llm: Some(false),
            ..Config::default()
        };
        let flags = Config {
            api_key: Some("flag-key".to_string()),
            ..Config::default()
        };

        let merged = file.overlay(flags);
        assert_eq!(merged.endpoint_url.as_deref(), Some("http://file.example/ask"));
        assert_eq!(merged.api_key.as_deref(), Some("flag-key"));
        assert_eq!(merged.use_llm, Some(false));
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let settings = with_key().resolve().unwrap();
        let printed = format!("{:?}", settings.backend);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn load_from_reads_partial_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = concat!(
            r#"{"endpoint_url": "https://techmate.example/ask", "#,
            r#""api_key": "k", "timeout_secs": 5}"#
        );
        file.write_all(body.as_bytes()).unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.endpoint_url.as_deref(), Some("https://techmate.example/ask"));
        assert_eq!(config.timeout_secs, Some(5));
        assert_eq!(config.greeting, None);
    }

    #[test]
    fn load_from_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            Config::load_from(&missing),
            Err(ConfigError::Read { .. })
        ));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(
            Config::load_from(&bad),
            Err(ConfigError::Parse { .. })
        ));
    }
}
