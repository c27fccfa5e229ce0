//! `fire-auth`: credential checks and authorization policies.
//!
//! This crate knows nothing about HTTP or storage. The API layer parses the
//! header, looks the user up, and asks a [`CredentialProvider`] for the password.

pub mod basic;
pub mod credentials;
pub mod kamailio;
pub mod policy;

pub use basic::BasicCredentials;
pub use credentials::{AuthDriver, AuthDriverKind, CredentialProvider, StaticCredentials, verify_password};
pub use kamailio::{KamailioConfig, KamailioDriver};
pub use policy::{AuthzError, Principal, admin_or_owner, admin_required};
