//! `fire-messaging` — admin-to-user messages and the notification feed.

pub mod message;
pub mod notification;

pub use message::Message;
pub use notification::{Notice, Notification, NotificationKind, Page};
