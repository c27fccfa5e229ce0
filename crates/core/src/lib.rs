//! `fire-core` — domain foundation shared by every Fire crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{MessageId, NewUserRequestId, NotificationId, UserId, VoucherId};
