use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::fetch::BackoffPolicy;

pub const ENV_WEATHER_API_KEY: &str = "WEATHER_API_KEY";
pub const ENV_APP_PORT: &str = "APP_PORT";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [server]
/// bind_address = "0.0.0.0:8080"
///
/// [providers]
/// hg_weather_api_key = "..."
///
/// [backoff]
/// max_attempts = 5
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub backoff: BackoffConfig,
    pub timeouts: TimeoutsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:8080".to_string() }
    }
}

/// Endpoints and credentials for the upstream services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub brasil_api_url: String,
    pub via_cep_url: String,
    pub hg_weather_url: String,
    pub hg_weather_api_key: Option<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            brasil_api_url: "https://brasilapi.com.br/api/cep/v1".to_string(),
            via_cep_url: "https://viacep.com.br/ws".to_string(),
            hg_weather_url: "https://api.hgbrasil.com/weather".to_string(),
            hg_weather_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            initial_interval_ms: policy.initial_interval.as_millis() as u64,
            max_interval_ms: policy.max_interval.as_millis() as u64,
            max_attempts: policy.max_attempts,
        }
    }
}

impl BackoffConfig {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial_interval: Duration::from_millis(self.initial_interval_ms),
            max_interval: Duration::from_millis(self.max_interval_ms),
            max_attempts: self.max_attempts,
        }
    }
}

/// Deadlines for a whole request and for each stage within it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub request_ms: u64,
    pub city_ms: u64,
    pub temperature_ms: u64,
    pub http_client_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self { request_ms: 3000, city_ms: 1000, temperature_ms: 1000, http_client_secs: 60 }
    }
}

impl TimeoutsConfig {
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn city(&self) -> Duration {
        Duration::from_millis(self.city_ms)
    }

    pub fn temperature(&self) -> Duration {
        Duration::from_millis(self.temperature_ms)
    }

    pub fn http_client(&self) -> Duration {
        Duration::from_secs(self.http_client_secs)
    }
}

impl Config {
    /// Load config from `path` (or the platform default), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = Self::load_file(path)?;
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load_file(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path()?,
        };
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Overlay `WEATHER_API_KEY` and `APP_PORT` as looked up by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_WEATHER_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.providers.hg_weather_api_key = Some(key);
        }

        if let Some(port) = lookup(ENV_APP_PORT) {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("{ENV_APP_PORT} is not a valid port: {port:?}"))?;
            let mut addr = self.bind_address()?;
            addr.set_port(port);
            self.server.bind_address = addr.to_string();
        }

        Ok(())
    }

    /// Save config to `path` (or the platform default), creating parent directories.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path()?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "cep-temp", "cep-temp")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind_address))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.providers.hg_weather_api_key = Some(api_key);
    }

    /// Returns the HG Weather key, or a hint on how to set one.
    pub fn api_key(&self) -> Result<&str> {
        self.providers
            .hg_weather_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No API key configured for HG Weather.\n\
                     Hint: run `cep-temp configure` or set {ENV_WEATHER_API_KEY}."
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn api_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.api_key().unwrap_err();

        assert!(err.to_string().contains("No API key configured"));
        assert!(err.to_string().contains("cep-temp configure"));
    }

    #[test]
    fn env_overrides_key_and_port() {
        let mut cfg = Config::default();
        cfg.apply_overrides(env(&[("WEATHER_API_KEY", "ENV_KEY"), ("APP_PORT", "9090")]))
            .expect("overrides apply");

        assert_eq!(cfg.api_key().unwrap(), "ENV_KEY");
        assert_eq!(cfg.server.bind_address, "0.0.0.0:9090");
    }

    #[test]
    fn blank_env_key_does_not_replace_stored_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("STORED".into());
        cfg.apply_overrides(env(&[("WEATHER_API_KEY", "  ")])).unwrap();

        assert_eq!(cfg.api_key().unwrap(), "STORED");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut cfg = Config::default();
        let err = cfg.apply_overrides(env(&[("APP_PORT", "http")])).unwrap_err();

        assert!(err.to_string().contains("APP_PORT"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [providers]
            hg_weather_api_key = "KEY"

            [backoff]
            max_attempts = 3
            "#,
        )
        .expect("parses");

        assert_eq!(cfg.api_key().unwrap(), "KEY");
        assert_eq!(cfg.providers.via_cep_url, "https://viacep.com.br/ws");
        assert_eq!(cfg.backoff.policy().max_attempts, 3);
        assert_eq!(cfg.backoff.policy().initial_interval, Duration::from_millis(100));
        assert_eq!(cfg.timeouts.city(), Duration::from_secs(1));
    }

    #[test]
    fn save_then_load_from_explicit_path() {
        let dir = std::env::temp_dir().join(format!("cep-temp-config-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("SAVED".into());
        cfg.timeouts.temperature_ms = 1500;
        cfg.save(Some(&path)).expect("save succeeds");

        let loaded = Config::load_file(Some(&path)).expect("load succeeds");
        assert_eq!(loaded.api_key().unwrap(), "SAVED");
        assert_eq!(loaded.timeouts.temperature(), Duration::from_millis(1500));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("cep-temp-does-not-exist/config.toml");
        let cfg = Config::load_file(Some(&path)).unwrap();

        assert_eq!(cfg.server.bind_address, "0.0.0.0:8080");
        assert!(cfg.providers.hg_weather_api_key.is_none());
    }
}
