//! Persistence layer: durable client-side records backed by libSQL.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use memory::MemoryStore;
pub use traits::{RecordStore, scopes};
