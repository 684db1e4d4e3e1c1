//! Client configuration.
//!
//! | Key | Env | Default |
//! |-----|-----|---------|
//! | api_base_url | TADKA__API_BASE_URL | http://127.0.0.1:8000 |
//! | request_timeout_secs | TADKA__REQUEST_TIMEOUT_SECS | 30 |
//! | token_store_path | TADKA__TOKEN_STORE_PATH | ./data/session |
//! | default_locale | TADKA__DEFAULT_LOCALE | en |
//! | login_path | TADKA__LOGIN_PATH | /login |

use crate::locale::Locale;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings shared by the gateway, token store and navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin every API path is joined onto.
    pub api_base_url: String,
    /// Default per-request timeout.
    pub request_timeout_secs: u64,
    /// Directory for the sled database holding the credential.
    pub token_store_path: String,
    /// Locale code used before the user toggles.
    pub default_locale: String,
    /// Login entry point for guard redirects.
    pub login_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_secs: 30,
            token_store_path: "./data/session".to_string(),
            default_locale: "en".to_string(),
            login_path: "/login".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load config from `.env`, file and environment. Precedence: env `TADKA__*` > file
    /// (`TADKA_CONFIG` path, else `config/client`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let config_path =
            std::env::var("TADKA_CONFIG").unwrap_or_else(|_| "config/client".to_string());
        Self::load_from(&config_path)
    }

    /// Same as [`ClientConfig::load`] without `.env` handling, reading the given file.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .set_default("token_store_path", defaults.token_store_path)?
            .set_default("default_locale", defaults.default_locale)?
            .set_default("login_path", defaults.login_path)?;

        let path = Path::new(config_path);
        let with_toml = path.with_extension("toml");
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else if with_toml.exists() {
            builder.add_source(config::File::from(with_toml))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("TADKA").separator("__"))
            .build()?;

        built.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Configured default locale; unknown codes fall back to English.
    pub fn locale(&self) -> Locale {
        Locale::from_code(&self.default_locale).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = ClientConfig::load_from("/nonexistent/tadka/client").unwrap();
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.login_path, "/login");
        assert_eq!(cfg.locale(), Locale::En);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "api_base_url = \"https://api.tadka.example\"").unwrap();
        writeln!(f, "default_locale = \"hi\"").unwrap();
        writeln!(f, "request_timeout_secs = 5").unwrap();

        let cfg = ClientConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.api_base_url, "https://api.tadka.example");
        assert_eq!(cfg.locale(), Locale::Hi);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.token_store_path, "./data/session");
    }
}
