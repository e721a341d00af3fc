mod memory;
mod repository;
mod sqlite;

pub use memory::InMemoryStore;
pub use repository::*;
pub use sqlite::SqliteStore;

/// SQL schema for accounts and transactions
pub const SCHEMA: &str = include_str!("schema.sql");
