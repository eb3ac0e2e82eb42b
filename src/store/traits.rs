//! `RecordStore` trait: single async interface for durable client state.
//!
//! Records are JSON values addressed by `(scope, key)`. They are always read
//! and written wholesale; there are no partial updates.

use async_trait::async_trait;

use crate::error::StoreError;

/// Record scopes.
pub mod scopes {
    /// Durable key/value records (selected course, current user, ...).
    pub const LOCAL: &str = "local";
    /// Session cookies, each stored with its own expiry.
    pub const COOKIE: &str = "cookie";
}

/// Backend-agnostic durable record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read one record. Unparseable stored values come back as `Value::Null`.
    async fn get(&self, scope: &str, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    /// Insert or replace one record.
    async fn set(&self, scope: &str, key: &str, value: &serde_json::Value)
    -> Result<(), StoreError>;

    /// Delete one record. Returns whether anything was removed.
    async fn remove(&self, scope: &str, key: &str) -> Result<bool, StoreError>;

    /// All records in a scope, ordered by key.
    async fn entries(&self, scope: &str) -> Result<Vec<(String, serde_json::Value)>, StoreError>;
}
