use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{
    ensure_identity, merge_fields, DeleteResult, DocumentStore, Filter, InsertResult, Sort,
    StoreError, UpdateResult,
};

/// Default document store, backed by a single sqlite table of JSON bodies.
/// The partial unique index on `payments.transactionId` is the
/// constraint-backed reconciliation guard.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("failed to open database")?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("failed to set database pragmas")?;

        migrate(&conn)?;

        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

// The payments index must stay in step with UNIQUE_INDEXES in store/mod.rs.
fn migrate(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS documents (
            seq        INTEGER PRIMARY KEY AUTOINCREMENT,
            collection TEXT NOT NULL,
            id         TEXT NOT NULL,
            body       TEXT NOT NULL,
            UNIQUE (collection, id)
        );
        CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents (collection);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_payments_transaction
            ON documents (json_extract(body, '$.transactionId'))
            WHERE collection = 'payments';",
    )
    .context("failed to run store migrations")?;
    Ok(())
}

fn map_insert_err(collection: &str, e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(f, _) = &e {
        if f.code == rusqlite::ErrorCode::ConstraintViolation {
            return StoreError::DuplicateKey {
                collection: collection.to_string(),
            };
        }
    }
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert_one(&self, collection: &str, mut doc: Value) -> Result<InsertResult, StoreError> {
        let id = ensure_identity(&mut doc)?;
        let body = serde_json::to_string(&doc)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
            params![collection, id, body],
        )
        .map_err(|e| map_insert_err(collection, e))?;

        Ok(InsertResult { inserted_id: id })
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Sort,
    ) -> Result<Vec<Value>, StoreError> {
        let order = match sort {
            Sort::InsertionOrder => "ASC",
            Sort::NewestFirst => "DESC",
        };
        let sql = format!("SELECT body FROM documents WHERE collection = ?1 ORDER BY seq {order}");

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;

        let mut docs = vec![];
        for row in rows {
            let doc: Value = serde_json::from_str(&row?)?;
            if filter.matches(&doc) {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match body {
            Some(b) => Some(serde_json::from_str(&b)?),
            None => None,
        })
    }

    async fn find_one_by(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        Ok(self
            .find(collection, filter, Sort::InsertionOrder)
            .await?
            .into_iter()
            .next())
    }

    async fn update_one(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<UpdateResult, StoreError> {
        self.update_matching(collection, id, None, patch)
    }

    async fn update_one_if(
        &self,
        collection: &str,
        id: &str,
        expect: &Filter,
        patch: Value,
    ) -> Result<UpdateResult, StoreError> {
        self.update_matching(collection, id, Some(expect), patch)
    }

    async fn delete_one(&self, collection: &str, id: &str) -> Result<DeleteResult, StoreError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(DeleteResult {
            deleted: deleted as u64,
        })
    }
}

impl SqliteStore {
    // Read-merge-write under one lock hold, so a conditional claim cannot
    // interleave with a concurrent writer.
    fn update_matching(
        &self,
        collection: &str,
        id: &str,
        expect: Option<&Filter>,
        patch: Value,
    ) -> Result<UpdateResult, StoreError> {
        let conn = self.conn.lock().unwrap();

        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(body) = body else {
            return Ok(UpdateResult { matched: 0, modified: 0 });
        };

        let mut doc: Value = serde_json::from_str(&body)?;

        if let Some(expect) = expect {
            if !expect.matches(&doc) {
                return Ok(UpdateResult { matched: 0, modified: 0 });
            }
        }

        let modified = merge_fields(&mut doc, &patch);
        if modified {
            let new_body = serde_json::to_string(&doc)?;
            conn.execute(
                "UPDATE documents SET body = ?1 WHERE collection = ?2 AND id = ?3",
                params![new_body, collection, id],
            )?;
        }

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

    fn setup() -> SqliteStore {
        SqliteStore::open(":memory:").unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find_roundtrip() {
        let store = setup();
        let res = store
            .insert_one("services", json!({"name": "Wedding Decor", "price": 250.0}))
            .await
            .unwrap();

        let doc = store.find_one("services", &res.inserted_id).await.unwrap().unwrap();
        assert_eq!(doc["name"], "Wedding Decor");
        assert_eq!(doc["_id"], res.inserted_id);
    }

    #[tokio::test]
    async fn test_newest_first_ordering() {
        let store = setup();
        store.insert_one("services", json!({"name": "first"})).await.unwrap();
        store.insert_one("services", json!({"name": "second"})).await.unwrap();

        let docs = store
            .find("services", &Filter::new(), Sort::NewestFirst)
            .await
            .unwrap();
        assert_eq!(docs[0]["name"], "second");
    }

    #[tokio::test]
    async fn test_duplicate_transaction_id_hits_unique_index() {
        let store = setup();
        store
            .insert_one(PAYMENTS, json!({"transactionId": "pi_abc"}))
            .await
            .unwrap();

        let err = store
            .insert_one(PAYMENTS, json!({"transactionId": "pi_abc"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_other_collections_unaffected_by_payments_index() {
        let store = setup();
        store
            .insert_one("bookings", json!({"transactionId": "pi_abc"}))
            .await
            .unwrap();
        store
            .insert_one("bookings", json!({"transactionId": "pi_abc"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_one_partial_merge() {
        let store = setup();
        let res = store
            .insert_one("bookings", json!({"status": "pending", "price": 99.0}))
            .await
            .unwrap();

        let up = store
            .update_one("bookings", &res.inserted_id, json!({"status": "assigned"}))
            .await
            .unwrap();
        assert_eq!((up.matched, up.modified), (1, 1));

        let doc = store.find_one("bookings", &res.inserted_id).await.unwrap().unwrap();
        assert_eq!(doc["status"], "assigned");
        assert_eq!(doc["price"], 99.0);
    }

    #[tokio::test]
    async fn test_conditional_update() {
        let store = setup();
        let res = store
            .insert_one("decorators", json!({"workStatus": "available"}))
            .await
            .unwrap();

        let claim = Filter::new().eq("workStatus", "available");
        let first = store
            .update_one_if("decorators", &res.inserted_id, &claim, json!({"workStatus": "in_project"}))
            .await
            .unwrap();
        assert_eq!(first.matched, 1);

        let second = store
            .update_one_if("decorators", &res.inserted_id, &claim, json!({"workStatus": "in_project"}))
            .await
            .unwrap();
        assert_eq!(second.matched, 0);
    }

    #[tokio::test]
    async fn test_update_missing_doc_matches_zero() {
        let store = setup();
        let up = store
            .update_one("bookings", "550e8400-e29b-41d4-a716-446655440000", json!({"x": 1}))
            .await
            .unwrap();
        assert_eq!(up.matched, 0);
    }

    #[tokio::test]
    async fn test_delete_one() {
        let store = setup();
        let res = store.insert_one("categories", json!({"name": "Lighting"})).await.unwrap();

        assert_eq!(store.delete_one("categories", &res.inserted_id).await.unwrap().deleted, 1);
        assert_eq!(store.delete_one("categories", &res.inserted_id).await.unwrap().deleted, 0);
    }
}
