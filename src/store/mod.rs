//! Generic document-store boundary.
//!
//! Attendance records, approval requests, permissions and notifications all
//! live in schemaless collections behind [`DocumentStore`]. Two backends are
//! provided: MySQL (one JSON column per document) for deployments and an
//! in-memory map for tests and `STORE_BACKEND=memory` runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use derive_more::Display;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Collection names used by this service.
pub mod collections {
    pub const ATTENDANCE: &str = "attendance";
    pub const LATE_APPROVALS: &str = "late_approvals";
    pub const LATE_PERMISSIONS: &str = "late_permissions";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const USERS: &str = "users";
}

/// Equality filter over document fields. Keys may be dotted paths
/// (`"data.approval_id"`) reaching into nested objects.
pub type Filter = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct Sort {
    pub field: String,
    pub order: Order,
}

impl Sort {
    pub fn desc(field: &str) -> Self {
        Sort { field: field.to_string(), order: Order::Desc }
    }

    pub fn asc(field: &str) -> Self {
        Sort { field: field.to_string(), order: Order::Asc }
    }
}

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),

    #[display(fmt = "document codec error: {}", _0)]
    Codec(serde_json::Error),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Codec(e)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, StoreError>;

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&Sort>,
        limit: Option<u64>,
    ) -> Result<Vec<Value>, StoreError>;

    async fn insert_one(&self, collection: &str, doc: &Value) -> Result<(), StoreError>;

    /// Shallow-merges the top-level fields of `patch` into the first document
    /// matching `filter`. Returns the number of documents touched (0 or 1).
    async fn update_one(&self, collection: &str, filter: &Filter, patch: &Value)
    -> Result<u64, StoreError>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;
}

/// Builds an equality filter from literal pairs.
pub fn filter_eq<const N: usize>(pairs: [(&str, Value); N]) -> Filter {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Decodes a stored document into a typed entity.
pub fn decode<T: DeserializeOwned>(doc: Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(doc)?)
}

/// Resolves a dotted field path inside a document.
pub(crate) fn lookup_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |v, seg| v.get(seg))
}
