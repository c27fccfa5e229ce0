//! Password lookup and provisioning on the SIP registrar.

use core::str::FromStr;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use fire_core::DomainError;

use crate::kamailio::KamailioDriver;

/// Registrar capability used by authentication and by signup acceptance.
///
/// Failures are never surfaced as errors: a lookup that cannot be answered is
/// "no password", a provisioning call that fails is `false`.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get_password(&self, account: &str) -> Option<String>;

    async fn add_user(&self, account: &str, password: &str) -> bool;
}

/// Compare `supplied` against the registrar's password for `account`.
pub async fn verify_password(provider: &dyn CredentialProvider, account: &str, supplied: &str) -> bool {
    match provider.get_password(account).await {
        Some(stored) => stored == supplied,
        None => {
            tracing::debug!(account, "no registrar password for account");
            false
        }
    }
}

/// Driver names accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDriverKind {
    Kamailio,
    Test,
}

impl AuthDriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthDriverKind::Kamailio => "kamailio",
            AuthDriverKind::Test => "test",
        }
    }
}

impl FromStr for AuthDriverKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kamailio" => Ok(AuthDriverKind::Kamailio),
            "test" => Ok(AuthDriverKind::Test),
            other => Err(DomainError::validation(format!("unknown auth driver: {other}"))),
        }
    }
}

/// The credential backend chosen at startup.
#[derive(Debug)]
pub enum AuthDriver {
    Kamailio(KamailioDriver),
    Static(StaticCredentials),
}

impl AuthDriver {
    pub fn kind(&self) -> AuthDriverKind {
        match self {
            AuthDriver::Kamailio(_) => AuthDriverKind::Kamailio,
            AuthDriver::Static(_) => AuthDriverKind::Test,
        }
    }
}

#[async_trait]
impl CredentialProvider for AuthDriver {
    async fn get_password(&self, account: &str) -> Option<String> {
        match self {
            AuthDriver::Kamailio(driver) => driver.get_password(account).await,
            AuthDriver::Static(driver) => driver.get_password(account).await,
        }
    }

    async fn add_user(&self, account: &str, password: &str) -> bool {
        match self {
            AuthDriver::Kamailio(driver) => driver.add_user(account, password).await,
            AuthDriver::Static(driver) => driver.add_user(account, password).await,
        }
    }
}

/// In-process registrar for tests and local runs.
///
/// Accounts without an explicit entry answer with the default password.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    default_password: Option<String>,
    passwords: RwLock<HashMap<String, String>>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_password(password: impl Into<String>) -> Self {
        Self {
            default_password: Some(password.into()),
            passwords: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_password(&self, account: impl Into<String>, password: impl Into<String>) {
        let mut passwords = self.passwords.write().unwrap_or_else(|e| e.into_inner());
        passwords.insert(account.into(), password.into());
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn get_password(&self, account: &str) -> Option<String> {
        let passwords = self.passwords.read().unwrap_or_else(|e| e.into_inner());
        passwords
            .get(account)
            .cloned()
            .or_else(|| self.default_password.clone())
    }

    /// Refuses accounts that already have a password of their own.
    async fn add_user(&self, account: &str, password: &str) -> bool {
        let mut passwords = self.passwords.write().unwrap_or_else(|e| e.into_inner());
        if passwords.contains_key(account) {
            tracing::debug!(account, "registrar account already exists");
            return false;
        }
        passwords.insert(account.to_string(), password.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_driver_falls_back_to_default_password() {
        let driver = AuthDriver::Static(StaticCredentials::with_default_password("pass"));
        assert_eq!(driver.get_password("joel").await.as_deref(), Some("pass"));
        assert!(verify_password(&driver, "joel", "pass").await);
        assert!(!verify_password(&driver, "joel", "nope").await);
    }

    #[tokio::test]
    async fn provisioned_accounts_override_the_default() {
        let driver = AuthDriver::Static(StaticCredentials::with_default_password("pass"));
        assert!(driver.add_user("5551234", "s3cret").await);
        assert!(verify_password(&driver, "5551234", "s3cret").await);
        assert!(!verify_password(&driver, "5551234", "pass").await);
    }

    #[tokio::test]
    async fn existing_accounts_are_not_reprovisioned() {
        let driver = AuthDriver::Static(StaticCredentials::with_default_password("pass"));
        assert!(driver.add_user("1", "first").await);
        assert!(!driver.add_user("1", "second").await);
        assert!(verify_password(&driver, "1", "first").await);
        assert!(!verify_password(&driver, "1", "second").await);
    }

    #[tokio::test]
    async fn without_default_unknown_accounts_fail() {
        let driver = StaticCredentials::new();
        assert_eq!(driver.get_password("joel").await, None);
        assert!(!verify_password(&driver, "joel", "").await);
    }

    #[test]
    fn driver_names_parse() {
        assert_eq!("kamailio".parse::<AuthDriverKind>().unwrap(), AuthDriverKind::Kamailio);
        assert_eq!(" Test ".parse::<AuthDriverKind>().unwrap(), AuthDriverKind::Test);
        assert!("ldap".parse::<AuthDriverKind>().is_err());
    }
}
