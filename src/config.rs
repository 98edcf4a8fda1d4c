use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Production API endpoint
pub const PRODUCTION_API_URL: &str = "https://api.trackgpx.com/api";
/// Local development API endpoint
pub const DEVELOPMENT_API_URL: &str = "http://127.0.0.1:8000/api";
/// Environment variable that overrides `api_url` at load time
pub const API_URL_ENV: &str = "TRACKGPX_API_URL";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the TrackGPX REST API (no trailing slash)
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Payment provider credentials
    #[serde(default)]
    pub openpay: OpenPaySettings,
    /// Map rendering settings
    #[serde(default)]
    pub maps: MapSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPaySettings {
    /// Merchant id issued by the provider
    #[serde(default)]
    pub merchant_id: String,
    /// Public API key (safe to ship to clients, only allows tokenization)
    #[serde(default)]
    pub public_key: String,
    /// Use the sandbox environment (default: true)
    #[serde(default = "default_sandbox")]
    pub sandbox: bool,
    /// Override for the provider base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSettings {
    /// Google Maps JavaScript API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Center used when there are no vehicles to show, as [lat, lng]
    #[serde(default = "default_center")]
    pub default_center: [f64; 2],
}

fn default_api_url() -> String {
    PRODUCTION_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_sandbox() -> bool {
    true
}

fn default_center() -> [f64; 2] {
    [-34.6037, -58.3816]
}

impl Default for OpenPaySettings {
    fn default() -> Self {
        Self {
            merchant_id: String::new(),
            public_key: String::new(),
            sandbox: true,
            api_base: None,
        }
    }
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            default_center: default_center(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            openpay: OpenPaySettings::default(),
            maps: MapSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    ///
    /// `TRACKGPX_API_URL` wins over the file value but is never written back.
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            let mut config: Config =
                toml::from_str(&content).with_context(|| "Failed to parse config file")?;

            if config.api_url.trim().is_empty() {
                config.api_url = default_api_url();
            }
            if config.timeout_secs == 0 {
                config.timeout_secs = default_timeout_secs();
            }
            config
        } else {
            let config = Self::default();
            config.save(config_path)?;
            config
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_url = url;
            }
        }
        config.api_url = config.api_url.trim_end_matches('/').to_string();

        Ok(config)
    }

    /// Save configuration to file with secure permissions
    pub fn save(&self, config_path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        // 600: the file may hold provider credentials
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(config_path)
                .with_context(|| format!("Failed to get file metadata: {:?}", config_path))?
                .permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(config_path, perms)
                .with_context(|| format!("Failed to set file permissions: {:?}", config_path))?;
        }

        Ok(())
    }

    /// Preset pointing at a locally running backend
    pub fn development() -> Self {
        Self {
            api_url: DEVELOPMENT_API_URL.to_string(),
            ..Self::default()
        }
    }

    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
