//! `smart_scraper.toml` settings.
//!
//! ```toml
//! data_dir = "data"
//! timeout_secs = 10
//! settle_seconds = 3
//!
//! [headers]
//! Accept-Language = "en-US"
//!
//! [ai]
//! provider = "groq"
//! model = "llama-3.3-70b-versatile"
//! max_rows = 20
//! max_prompt_chars = 8000
//! ```
//!
//! Every key is optional. The file itself is optional unless named
//! explicitly with `--config` or `SMART_SCRAPER_CONFIG`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use smart_scraper_acquire::{AcquireConfig, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use smart_scraper_ai::{AnalysisConfig, ProviderKind};
use smart_scraper_extract_models::{DEFAULT_SETTLE_SECONDS, clamp_settle_seconds};

/// Config file looked for in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "smart_scraper.toml";

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "SMART_SCRAPER_CONFIG";

/// Errors loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Cannot read config {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`AppConfig`].
    #[error("Invalid config {path}: {source}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// A value is out of range or unknown.
    #[error("Invalid config value: {0}")]
    Value(String),
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of saved projects and custom templates.
    pub data_dir: PathBuf,
    /// Static fetch timeout.
    pub timeout_secs: u64,
    /// `User-Agent` for static and rendered fetches.
    pub user_agent: String,
    /// Default wait after navigation in dynamic mode.
    pub settle_seconds: u64,
    /// Extra headers sent with static fetches.
    pub headers: BTreeMap<String, String>,
    /// LLM settings.
    pub ai: AiSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            settle_seconds: DEFAULT_SETTLE_SECONDS,
            headers: BTreeMap::new(),
            ai: AiSettings::default(),
        }
    }
}

/// `[ai]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// `openai`, `groq`, or `gemini`.
    pub provider: String,
    /// Model id; the provider's default when unset.
    pub model: Option<String>,
    /// Prompt bounds.
    #[serde(flatten)]
    pub limits: AnalysisConfig,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Groq.to_string(),
            model: None,
            limits: AnalysisConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads settings from `explicit`, else from `$SMART_SCRAPER_CONFIG`,
    /// else from `./smart_scraper.toml` if present, else defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a named file is missing or any file is
    /// malformed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        let path = match named {
            Some(path) => path,
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    log::debug!("No {DEFAULT_CONFIG_FILE}; using defaults");
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::de::from_str(text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Value("timeout_secs must be at least 1".to_string()));
        }
        self.provider()?;
        Ok(())
    }

    /// HTTP settings for acquisition.
    #[must_use]
    pub fn acquire_config(&self) -> AcquireConfig {
        self.headers.iter().fold(
            AcquireConfig::default()
                .with_user_agent(&self.user_agent)
                .with_timeout(Duration::from_secs(self.timeout_secs)),
            |config, (key, value)| config.with_header(key, value),
        )
    }

    /// Default settle time, clamped into range.
    #[must_use]
    pub fn settle_seconds(&self) -> u64 {
        clamp_settle_seconds(self.settle_seconds)
    }

    /// The configured LLM provider.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Value`] for an unknown provider name.
    pub fn provider(&self) -> Result<ProviderKind, ConfigError> {
        ProviderKind::from_str(&self.ai.provider)
            .map_err(|_| ConfigError::Value(format!("unknown AI provider '{}'", self.ai.provider)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.ai.limits.max_rows, 20);
        assert_eq!(config.provider().unwrap(), ProviderKind::Groq);
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let config = AppConfig::from_toml(
            r#"
            data_dir = "/tmp/scrapes"
            settle_seconds = 30

            [ai]
            provider = "Gemini"
            max_rows = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/scrapes"));
        assert_eq!(config.settle_seconds(), 10);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.provider().unwrap(), ProviderKind::Gemini);
        assert_eq!(config.ai.limits.max_rows, 5);
        assert_eq!(config.ai.limits.max_prompt_chars, 8000);
    }

    #[test]
    fn headers_table_reaches_acquire_config() {
        let config = AppConfig::from_toml(
            r#"
            [headers]
            Accept-Language = "en-US"
            Referer = "https://example.com/"
            "#,
        )
        .unwrap();

        let acquire = config.acquire_config();
        assert_eq!(acquire.headers.len(), 2);
        assert_eq!(
            acquire.headers.get("Accept-Language").map(String::as_str),
            Some("en-US")
        );
        assert_eq!(acquire.user_agent, DEFAULT_USER_AGENT);
        assert!(AppConfig::default().acquire_config().headers.is_empty());
    }

    #[test]
    fn explicit_file_is_loaded_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.toml");
        std::fs::write(&good, "timeout_secs = 30\n").unwrap();
        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[ai]\nprovider = \"claude\"\n").unwrap();

        assert_eq!(
            AppConfig::load(Some(&good)).unwrap().acquire_config().timeout,
            Duration::from_secs(30)
        );
        assert!(matches!(
            AppConfig::load(Some(&bad)),
            Err(ConfigError::Value(_))
        ));
        assert!(matches!(
            AppConfig::load(Some(&dir.path().join("missing.toml"))),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "timeout_secs = \"soon\"").unwrap();

        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
