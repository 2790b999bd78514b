use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    ensure_identity, merge_fields, DeleteResult, DocumentStore, Filter, InsertResult, Sort,
    StoreError, UpdateResult, UNIQUE_INDEXES,
};

/// In-memory document store. Selected with `STORE=memory` and used by the
/// test suite; enforces the same unique indexes as the sqlite backend, so
/// the duplicate-key reconciliation guard holds here too.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    unique_indexes: Vec<(String, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            collections: RwLock::new(HashMap::new()),
            unique_indexes: UNIQUE_INDEXES
                .iter()
                .map(|(c, f)| (c.to_string(), f.to_string()))
                .collect(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: &str, mut doc: Value) -> Result<InsertResult, StoreError> {
        let id = ensure_identity(&mut doc)?;

        // Uniqueness is checked under the same write lock as the push, so
        // concurrent inserts cannot both pass the check.
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        for (col, field) in &self.unique_indexes {
            if col != collection {
                continue;
            }
            if let Some(value) = doc.get(field.as_str()) {
                if docs.iter().any(|d| d.get(field.as_str()) == Some(value)) {
                    return Err(StoreError::DuplicateKey {
                        collection: collection.to_string(),
                    });
                }
            }
        }

        docs.push(doc);
        Ok(InsertResult { inserted_id: id })
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Sort,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        let docs = collections.get(collection).map(Vec::as_slice).unwrap_or(&[]);

        let matched = docs.iter().filter(|d| filter.matches(d)).cloned();
        Ok(match sort {
            Sort::InsertionOrder => matched.collect(),
            Sort::NewestFirst => {
                let mut v: Vec<Value> = matched.collect();
                v.reverse();
                v
            }
        })
    }

    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.get("_id").and_then(Value::as_str) == Some(id)))
            .cloned())
    }

    async fn find_one_by(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)))
            .cloned())
    }

    async fn update_one(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<UpdateResult, StoreError> {
        self.update_matching(collection, id, None, patch).await
    }

    async fn update_one_if(
        &self,
        collection: &str,
        id: &str,
        expect: &Filter,
        patch: Value,
    ) -> Result<UpdateResult, StoreError> {
        self.update_matching(collection, id, Some(expect), patch).await
    }

    async fn delete_one(&self, collection: &str, id: &str) -> Result<DeleteResult, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(DeleteResult { deleted: 0 });
        };
        let before = docs.len();
        docs.retain(|d| d.get("_id").and_then(Value::as_str) != Some(id));
        Ok(DeleteResult {
            deleted: (before - docs.len()) as u64,
        })
    }
}

impl MemoryStore {
    async fn update_matching(
        &self,
        collection: &str,
        id: &str,
        expect: Option<&Filter>,
        patch: Value,
    ) -> Result<UpdateResult, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(UpdateResult { matched: 0, modified: 0 });
        };

        let Some(doc) = docs
            .iter_mut()
            .find(|d| d.get("_id").and_then(Value::as_str) == Some(id))
        else {
            return Ok(UpdateResult { matched: 0, modified: 0 });
        };

        if let Some(expect) = expect {
            if !expect.matches(doc) {
                return Ok(UpdateResult { matched: 0, modified: 0 });
            }
        }

        let modified = merge_fields(doc, &patch);
        Ok(UpdateResult {
            matched: 1,
            modified: modified as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PAYMENTS;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_and_find_one() {
        let store = MemoryStore::new();
        let res = store
            .insert_one("services", json!({"name": "Wedding Decor"}))
            .await
            .unwrap();

        let doc = store.find_one("services", &res.inserted_id).await.unwrap().unwrap();
        assert_eq!(doc["name"], "Wedding Decor");
        assert!(doc["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_find_newest_first() {
        let store = MemoryStore::new();
        store.insert_one("services", json!({"name": "first"})).await.unwrap();
        store.insert_one("services", json!({"name": "second"})).await.unwrap();

        let docs = store
            .find("services", &Filter::new(), Sort::NewestFirst)
            .await
            .unwrap();
        assert_eq!(docs[0]["name"], "second");
        assert_eq!(docs[1]["name"], "first");
    }

    #[tokio::test]
    async fn test_find_with_filter() {
        let store = MemoryStore::new();
        store
            .insert_one("bookings", json!({"status": "pending", "customerEmail": "a@b.com"}))
            .await
            .unwrap();
        store
            .insert_one("bookings", json!({"status": "completed", "customerEmail": "a@b.com"}))
            .await
            .unwrap();

        let docs = store
            .find(
                "bookings",
                &Filter::new().eq("customerEmail", "a@b.com").ne("status", "completed"),
                Sort::NewestFirst,
            )
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["status"], "pending");
    }

    #[tokio::test]
    async fn test_duplicate_transaction_id_rejected() {
        let store = MemoryStore::new();
        store
            .insert_one(PAYMENTS, json!({"transactionId": "pi_1", "amount": 10.0}))
            .await
            .unwrap();

        let err = store
            .insert_one(PAYMENTS, json!({"transactionId": "pi_1", "amount": 10.0}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_unique_index_scoped_to_collection() {
        let store = MemoryStore::new();
        store
            .insert_one("bookings", json!({"transactionId": "pi_1"}))
            .await
            .unwrap();
        // Same field value outside the payments collection is fine.
        store
            .insert_one("bookings", json!({"transactionId": "pi_1"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        let res = store
            .insert_one("bookings", json!({"status": "pending", "price": 50.0}))
            .await
            .unwrap();

        let up = store
            .update_one("bookings", &res.inserted_id, json!({"status": "assigned"}))
            .await
            .unwrap();
        assert_eq!(up.matched, 1);
        assert_eq!(up.modified, 1);

        let doc = store.find_one("bookings", &res.inserted_id).await.unwrap().unwrap();
        assert_eq!(doc["status"], "assigned");
        assert_eq!(doc["price"], 50.0);
    }

    #[tokio::test]
    async fn test_conditional_update_claims_once() {
        let store = MemoryStore::new();
        let res = store
            .insert_one("decorators", json!({"workStatus": "available"}))
            .await
            .unwrap();

        let expect = Filter::new().eq("workStatus", "available");
        let first = store
            .update_one_if("decorators", &res.inserted_id, &expect, json!({"workStatus": "in_project"}))
            .await
            .unwrap();
        assert_eq!(first.matched, 1);

        let second = store
            .update_one_if("decorators", &res.inserted_id, &expect, json!({"workStatus": "in_project"}))
            .await
            .unwrap();
        assert_eq!(second.matched, 0);
    }

    #[tokio::test]
    async fn test_delete_one() {
        let store = MemoryStore::new();
        let res = store.insert_one("services", json!({"name": "x"})).await.unwrap();

        let del = store.delete_one("services", &res.inserted_id).await.unwrap();
        assert_eq!(del.deleted, 1);

        let again = store.delete_one("services", &res.inserted_id).await.unwrap();
        assert_eq!(again.deleted, 0);
    }
}
