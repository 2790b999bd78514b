pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

pub const BOOKINGS: &str = "bookings";
pub const PAYMENTS: &str = "payments";
pub const DECORATORS: &str = "decorators";
pub const SERVICES: &str = "services";
pub const CATEGORIES: &str = "categories";
pub const COVERAGE_AREAS: &str = "coverage_areas";
pub const USERS: &str = "users";

/// Unique indexes every store implementation must enforce. The payments
/// index is the race guard for reconciliation: a duplicate-key insert is
/// the "already processed" signal, not the preceding read.
pub const UNIQUE_INDEXES: &[(&str, &str)] = &[(PAYMENTS, "transactionId")];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate key in {collection}")]
    DuplicateKey { collection: String },

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Equality / not-equal conditions on top-level document fields.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    eq: Vec<(String, Value)>,
    ne: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.eq.push((field.to_string(), value.into()));
        self
    }

    pub fn ne(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.ne.push((field.to_string(), value.into()));
        self
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.eq.iter().all(|(k, v)| doc.get(k) == Some(v))
            && self.ne.iter().all(|(k, v)| doc.get(k) != Some(v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    InsertionOrder,
    NewestFirst,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub inserted_id: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DeleteResult {
    pub deleted: u64,
}

/// Generic mapping-based record store. Documents are JSON objects keyed by
/// a store-generated `_id`; collections have no enforced schema beyond the
/// configured unique indexes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, collection: &str, doc: Value) -> Result<InsertResult, StoreError>;

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Sort,
    ) -> Result<Vec<Value>, StoreError>;

    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    async fn find_one_by(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError>;

    /// Partial field merge: top-level fields of `patch` overwrite the
    /// stored document.
    async fn update_one(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<UpdateResult, StoreError>;

    /// Like `update_one`, but matches only while `expect` holds. Used to
    /// claim a decorator without racing a concurrent assignment.
    async fn update_one_if(
        &self,
        collection: &str,
        id: &str,
        expect: &Filter,
        patch: Value,
    ) -> Result<UpdateResult, StoreError>;

    async fn delete_one(&self, collection: &str, id: &str) -> Result<DeleteResult, StoreError>;
}

/// Ids are store-generated UUIDs; anything else is rejected lexically
/// before lookup and resolves to an empty result.
pub fn is_well_formed_id(s: &str) -> bool {
    Uuid::parse_str(s).is_ok()
}

pub(crate) fn ensure_identity(doc: &mut Value) -> Result<String, StoreError> {
    let obj = doc
        .as_object_mut()
        .ok_or_else(|| StoreError::Backend("document must be a JSON object".to_string()))?;

    let id = match obj.get("_id").and_then(Value::as_str) {
        Some(s) => s.to_string(),
        None => {
            let id = Uuid::new_v4().to_string();
            obj.insert("_id".to_string(), Value::String(id.clone()));
            id
        }
    };

    obj.entry("createdAt")
        .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

    Ok(id)
}

pub(crate) fn merge_fields(doc: &mut Value, patch: &Value) -> bool {
    let (Some(obj), Some(patch_obj)) = (doc.as_object_mut(), patch.as_object()) else {
        return false;
    };
    let mut changed = false;
    for (k, v) in patch_obj {
        if obj.get(k) != Some(v) {
            obj.insert(k.clone(), v.clone());
            changed = true;
        }
    }
    changed
}
