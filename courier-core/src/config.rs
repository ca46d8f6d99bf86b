use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, env, fs, path::Path, path::PathBuf, time::Duration};

/// Five minutes, matching the overall per-request deadline of the web client.
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

pub const ENV_BASE_URL: &str = "COURIER_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "COURIER_TIMEOUT_MS";

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Construction-time settings for a `Client`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Prepended to relative request URLs. May be empty.
    #[serde(default)]
    pub base_url: String,

    /// Overall per-request deadline in milliseconds. Must be non-zero.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Sent with every request unless the descriptor overrides them.
    ///
    /// Example TOML:
    /// [client.headers]
    /// accept = "application/json"
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            headers: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// Fails when `timeout` is below one millisecond.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let cfg = Self {
            base_url: base_url.into(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            headers: BTreeMap::new(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(anyhow!(
                "Client timeout must be at least 1ms; a zero deadline fails every request."
            ));
        }
        Ok(())
    }

    /// Apply `COURIER_BASE_URL` / `COURIER_TIMEOUT_MS` when set.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(env::var(ENV_BASE_URL).ok(), env::var(ENV_TIMEOUT_MS).ok())
    }

    fn apply_overrides(&mut self, base_url: Option<String>, timeout: Option<String>) -> Result<()> {
        let mut next = self.clone();
        if let Some(base_url) = base_url {
            next.base_url = base_url;
        }
        if let Some(raw) = timeout {
            next.timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {ENV_TIMEOUT_MS} value: {raw:?}"))?;
        }
        next.validate()
            .with_context(|| format!("Invalid {ENV_TIMEOUT_MS} value"))?;
        *self = next;
        Ok(())
    }
}

/// Credentials for the weather forecast endpoint (RapidAPI).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCredentials {
    pub api_key: String,
    pub api_host: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,

    /// Example TOML:
    /// [weather]
    /// api_key = "..."
    /// api_host = "weatherbit-v1-mashape.p.rapidapi.com"
    pub weather: Option<WeatherCredentials>,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        cfg.client
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "courier", "courier")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn weather_credentials(&self) -> Result<&WeatherCredentials> {
        self.weather.as_ref().ok_or_else(|| {
            anyhow!(
                "No weather API credentials configured.\n\
                 Hint: run `courier configure` and enter your RapidAPI key."
            )
        })
    }
}
