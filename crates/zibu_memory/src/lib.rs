//! # Zibu Memory
//!
//! Persistence for the needs simulation: a fail-soft gateway that reads and
//! writes the `{ needs, lastUpdated }` snapshot, a background writer that
//! queues and coalesces saves, and a SQLite byte-store backend.

pub mod gateway;
pub mod sqlite;

pub use gateway::{PersistWriter, PersistenceGateway};
pub use sqlite::SqliteStore;
