//! Server configuration for `chefmarket serve`.
//!
//! Settings come from, in increasing precedence: built-in defaults, an
//! optional TOML file (`--config`), `CHEFMARKET_*` environment variables and
//! command-line flags.
//!
//! # Example
//!
//! ```toml
//! port = 8080
//! reconcile_interval_secs = 300
//! cors_origins = ["http://localhost:5173"]
//!
//! [identity]
//! mode = "http"
//! verify_url = "https://identity.example.com/verify"
//! timeout_secs = 10
//!
//! [payment]
//! mode = "http"
//! api_url = "https://api.stripe.com"
//! secret_key = "sk_test_..."
//! currency = "usd"
//! ```
//!
//! In `static` identity mode the `[identity.tokens]` table maps bearer
//! tokens to account emails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub const ENV_PORT: &str = "CHEFMARKET_PORT";
pub const ENV_IDENTITY_URL: &str = "CHEFMARKET_IDENTITY_URL";
pub const ENV_PAYMENT_SECRET_KEY: &str = "CHEFMARKET_PAYMENT_SECRET_KEY";
pub const ENV_RECONCILE_INTERVAL: &str = "CHEFMARKET_RECONCILE_INTERVAL_SECS";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PAYMENT_API_URL: &str = "https://api.stripe.com";
const DEFAULT_CURRENCY: &str = "usd";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which adapter backs a provider contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    #[default]
    Static,
    Http,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub port: u16,
    /// Seconds between background reconciliation passes. `0` disables them.
    pub reconcile_interval_secs: u64,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
    pub identity: IdentitySettings,
    pub payment: PaymentSettings,
}

/// `[identity]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentitySettings {
    pub mode: ProviderMode,
    pub verify_url: Option<String>,
    pub timeout_secs: u64,
    /// Token → email table for `static` mode.
    pub tokens: BTreeMap<String, String>,
}

/// `[payment]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaymentSettings {
    pub mode: ProviderMode,
    pub api_url: String,
    pub secret_key: Option<String>,
    pub currency: String,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            reconcile_interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
            cors_origins: Vec::new(),
            identity: IdentitySettings::default(),
            payment: PaymentSettings::default(),
        }
    }
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            mode: ProviderMode::Static,
            verify_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            tokens: BTreeMap::new(),
        }
    }
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            mode: ProviderMode::Static,
            api_url: DEFAULT_PAYMENT_API_URL.to_string(),
            secret_key: None,
            currency: DEFAULT_CURRENCY.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl IdentitySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PaymentSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Resolve settings from the file at `path` (if any), the process
    /// environment and the `--port` flag.
    pub fn load(path: Option<&Path>, port_flag: Option<u16>) -> Result<Self, ConfigError> {
        Self::resolve(path, port_flag, |var| std::env::var(var).ok())
    }

    fn resolve<F>(path: Option<&Path>, port_flag: Option<u16>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(env)?;
        if let Some(port) = port_flag {
            settings.port = port;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| env(var).filter(|v| !v.trim().is_empty());

        if let Some(value) = non_empty(ENV_PORT) {
            self.port = value.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_PORT,
                value,
            })?;
        }
        if let Some(value) = non_empty(ENV_RECONCILE_INTERVAL) {
            self.reconcile_interval_secs =
                value.trim().parse().map_err(|_| ConfigError::Env {
                    var: ENV_RECONCILE_INTERVAL,
                    value,
                })?;
        }
        if let Some(url) = non_empty(ENV_IDENTITY_URL) {
            self.identity.mode = ProviderMode::Http;
            self.identity.verify_url = Some(url);
        }
        if let Some(key) = non_empty(ENV_PAYMENT_SECRET_KEY) {
            self.payment.mode = ProviderMode::Http;
            self.payment.secret_key = Some(key);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.mode == ProviderMode::Http && self.identity.verify_url.is_none() {
            return Err(ConfigError::Invalid(
                "identity mode 'http' requires identity.verify_url".to_string(),
            ));
        }
        if self.payment.mode == ProviderMode::Http && self.payment.secret_key.is_none() {
            return Err(ConfigError::Invalid(
                "payment mode 'http' requires payment.secret_key".to_string(),
            ));
        }
        if self.payment.currency.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "payment.currency must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
