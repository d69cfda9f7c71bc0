//! Storage backend implementations
//!
//! PostgreSQL (with PostGIS) is the production backend; the in-memory
//! backend serves development and the integration tests.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryPropertyStore;
pub use postgres::PgPropertyStore;
