//! Persistence layer — libSQL-backed storage for profiles, credits and searches.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{Database, ProfileStore, SearchStore};
