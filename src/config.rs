//! Configuration file parser for ~/.config/pulse/config.toml.
//!
//! The config file is optional: a missing or empty file yields
//! `Config::default()`, which leaves both providers unconfigured. Unknown
//! top-level keys are accepted but logged as likely typos.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::provider::Provider;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// OAuth application settings for one provider.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Application (client) id registered with the provider.
    pub client_id: String,
    /// Authorization dialog URL.
    pub authorize_url: String,
    /// Graph API base URL used for data requests.
    pub graph_url: String,
}

impl ProviderConfig {
    fn facebook() -> Self {
        Self {
            client_id: Provider::Facebook.placeholder_client_id().to_string(),
            authorize_url: "https://www.facebook.com/v18.0/dialog/oauth".to_string(),
            graph_url: "https://graph.facebook.com/v18.0".to_string(),
        }
    }

    fn instagram() -> Self {
        Self {
            client_id: Provider::Instagram.placeholder_client_id().to_string(),
            authorize_url: "https://api.instagram.com/oauth/authorize".to_string(),
            graph_url: "https://graph.instagram.com".to_string(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Loopback port the OAuth redirect lands on.
    pub redirect_port: u16,

    /// How long to wait for the user to finish authorizing in the browser.
    pub auth_timeout_secs: u64,

    /// Per-request timeout for Graph API calls.
    pub request_timeout_secs: u64,

    #[serde(deserialize_with = "facebook_section")]
    pub facebook: ProviderConfig,

    #[serde(deserialize_with = "instagram_section")]
    pub instagram: ProviderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redirect_port: 8765,
            auth_timeout_secs: 300,
            request_timeout_secs: 30,
            facebook: ProviderConfig::facebook(),
            instagram: ProviderConfig::instagram(),
        }
    }
}

/// Fill blank fields of a partially specified section from `defaults`.
fn with_defaults(mut section: ProviderConfig, defaults: ProviderConfig) -> ProviderConfig {
    if section.client_id.trim().is_empty() {
        section.client_id = defaults.client_id;
    }
    if section.authorize_url.trim().is_empty() {
        section.authorize_url = defaults.authorize_url;
    }
    if section.graph_url.trim().is_empty() {
        section.graph_url = defaults.graph_url;
    }
    section
}

fn facebook_section<'de, D>(deserializer: D) -> Result<ProviderConfig, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let section = ProviderConfig::deserialize(deserializer)?;
    Ok(with_defaults(section, ProviderConfig::facebook()))
}

fn instagram_section<'de, D>(deserializer: D) -> Result<ProviderConfig, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let section = ProviderConfig::deserialize(deserializer)?;
    Ok(with_defaults(section, ProviderConfig::instagram()))
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "redirect_port",
                "auth_timeout_secs",
                "request_timeout_secs",
                "facebook",
                "instagram",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            facebook = config.client_id(Provider::Facebook).is_some(),
            instagram = config.client_id(Provider::Instagram).is_some(),
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn provider(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::Facebook => &self.facebook,
            Provider::Instagram => &self.instagram,
        }
    }

    /// The provider's client id, or `None` while it is blank or still the
    /// sample placeholder.
    pub fn client_id(&self, provider: Provider) -> Option<&str> {
        let id = self.provider(provider).client_id.trim();
        if id.is_empty() || id == provider.placeholder_client_id() {
            None
        } else {
            Some(id)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("pulse_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config_is_unconfigured() {
        let config = Config::default();
        assert_eq!(config.redirect_port, 8765);
        assert_eq!(config.auth_timeout_secs, 300);
        assert!(config.client_id(Provider::Facebook).is_none());
        assert!(config.client_id(Provider::Instagram).is_none());
        assert_eq!(config.facebook.graph_url, "https://graph.facebook.com/v18.0");
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/pulse_test_nonexistent_config.toml");
        assert_eq!(Config::load(path).unwrap(), Config::default());
    }

    #[test]
    fn test_empty_file_returns_default() {
        let path = write_config("empty", "   \n");
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_section_keeps_endpoint_defaults() {
        let path = write_config(
            "partial",
            r#"
redirect_port = 9000

[facebook]
client_id = "1234567890"
"#,
        );
        let config = Config::load(&path).unwrap();

        assert_eq!(config.redirect_port, 9000);
        assert_eq!(config.client_id(Provider::Facebook), Some("1234567890"));
        assert_eq!(
            config.facebook.authorize_url,
            "https://www.facebook.com/v18.0/dialog/oauth"
        );
        assert!(config.client_id(Provider::Instagram).is_none());
        assert_eq!(config.instagram.graph_url, "https://graph.instagram.com");
    }

    #[test]
    fn test_placeholder_counts_as_unconfigured() {
        let path = write_config(
            "placeholder",
            r#"
[instagram]
client_id = "YOUR_INSTAGRAM_CLIENT_ID"
"#,
        );
        let config = Config::load(&path).unwrap();
        assert!(config.client_id(Provider::Instagram).is_none());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let path = write_config("invalid", "redirect_port = [");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let path = write_config("unknown", "theme = \"dark\"\n");
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }
}
