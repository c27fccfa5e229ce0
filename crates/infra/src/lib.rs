//! Infrastructure layer: persistence port and its adapters, demo seed data.

pub mod memory;
pub mod postgres;
pub mod seed;
pub mod store;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{Decided, FireStore};
