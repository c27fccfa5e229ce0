//! Process configuration, read once at startup from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use fire_auth::kamailio::{DEFAULT_ADD_USER, DEFAULT_GET_USER};
use fire_auth::{AuthDriver, AuthDriverKind, KamailioConfig, KamailioDriver, StaticCredentials};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TEST_PASSWORD: &str = "pass";
pub const DEFAULT_SIP_HOST: &str = "localhost:5060";
pub const DEFAULT_CREDENTIAL_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub auth_driver: AuthDriverKind,
    pub kamailio: KamailioConfig,
    /// Password the static driver answers for every account.
    pub test_password: String,
    /// SIP host advertised to clients in user payloads.
    pub sip_host: String,
    pub persistent: bool,
    pub database_url: Option<String>,
    pub seed: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Unset and empty values take the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind_addr = get("FIRE_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "FIRE_BIND_ADDR",
                reason: e.to_string(),
            })?;

        let auth_driver = match get("FIRE_AUTH_DRIVER") {
            Some(name) => name.parse::<AuthDriverKind>().map_err(|e| ConfigError::Invalid {
                var: "FIRE_AUTH_DRIVER",
                reason: e.to_string(),
            })?,
            None => AuthDriverKind::Kamailio,
        };

        let timeout_secs = match get("FIRE_CREDENTIAL_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: "FIRE_CREDENTIAL_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_CREDENTIAL_TIMEOUT_SECS,
        };

        let persistent = flag(get("USE_PERSISTENT_STORES"), "USE_PERSISTENT_STORES")?;
        let database_url = get("DATABASE_URL");
        if persistent && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            bind_addr,
            auth_driver,
            kamailio: KamailioConfig {
                get_user_cmd: get("FIRE_KAMAILIO_GET_USER").unwrap_or_else(|| DEFAULT_GET_USER.to_string()),
                add_user_cmd: get("FIRE_KAMAILIO_ADD_USER").unwrap_or_else(|| DEFAULT_ADD_USER.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            test_password: get("FIRE_TEST_PASSWORD").unwrap_or_else(|| DEFAULT_TEST_PASSWORD.to_string()),
            sip_host: get("FIRE_SIP_HOST").unwrap_or_else(|| DEFAULT_SIP_HOST.to_string()),
            persistent,
            database_url,
            seed: flag(get("FIRE_SEED"), "FIRE_SEED")?,
        })
    }

    /// In-memory store with demo data, static credentials, ephemeral port.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            auth_driver: AuthDriverKind::Test,
            kamailio: KamailioConfig::default(),
            test_password: DEFAULT_TEST_PASSWORD.to_string(),
            sip_host: DEFAULT_SIP_HOST.to_string(),
            persistent: false,
            database_url: None,
            seed: true,
        }
    }

    pub fn build_auth_driver(&self) -> AuthDriver {
        match self.auth_driver {
            AuthDriverKind::Kamailio => AuthDriver::Kamailio(KamailioDriver::new(self.kamailio.clone())),
            AuthDriverKind::Test => {
                AuthDriver::Static(StaticCredentials::with_default_password(self.test_password.clone()))
            }
        }
    }
}

fn flag(value: Option<String>, var: &'static str) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::Invalid {
                var,
                reason: format!("expected a boolean, got {other:?}"),
            }),
        },
    }
}
