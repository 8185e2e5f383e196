//! In-memory document store used by the test suite and `STORE_BACKEND=memory`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{DocumentStore, Filter, Order, Sort, StoreError, lookup_path};

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(doc: &Value, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(path, expected)| lookup_path(doc, path) == Some(expected))
}

fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        let guard = self.collections.lock().unwrap();
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches(d, filter)).cloned()))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&Sort>,
        limit: Option<u64>,
    ) -> Result<Vec<Value>, StoreError> {
        let guard = self.collections.lock().unwrap();
        let mut out: Vec<Value> = guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).cloned().collect())
            .unwrap_or_default();

        if let Some(sort) = sort {
            out.sort_by(|a, b| {
                let av = lookup_path(a, &sort.field).unwrap_or(&Value::Null);
                let bv = lookup_path(b, &sort.field).unwrap_or(&Value::Null);
                let ord = cmp_values(av, bv);
                match sort.order {
                    Order::Asc => ord,
                    Order::Desc => ord.reverse(),
                }
            });
        }

        if let Some(limit) = limit {
            out.truncate(limit as usize);
        }

        Ok(out)
    }

    async fn insert_one(&self, collection: &str, doc: &Value) -> Result<(), StoreError> {
        let mut guard = self.collections.lock().unwrap();
        guard
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Value,
    ) -> Result<u64, StoreError> {
        let mut guard = self.collections.lock().unwrap();
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let Some(doc) = docs.iter_mut().find(|d| matches(d, filter)) else {
            return Ok(0);
        };

        if let (Value::Object(target), Value::Object(fields)) = (doc, patch) {
            for (k, v) in fields {
                target.insert(k.clone(), v.clone());
            }
        }
        Ok(1)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut guard = self.collections.lock().unwrap();
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !matches(d, filter));
        Ok((before - docs.len()) as u64)
    }

    async fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let guard = self.collections.lock().unwrap();
        Ok(guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).count() as u64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::filter_eq;
    use serde_json::json;

    #[actix_web::test]
    async fn find_filters_on_dotted_paths() {
        let store = MemoryStore::new();
        store
            .insert_one("notifications", &json!({"id": "n1", "data": {"approval_id": "a1"}}))
            .await
            .unwrap();
        store
            .insert_one("notifications", &json!({"id": "n2", "data": {"approval_id": "a2"}}))
            .await
            .unwrap();

        let hits = store
            .find(
                "notifications",
                &filter_eq([("data.approval_id", json!("a1"))]),
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], json!("n1"));
    }

    #[actix_web::test]
    async fn find_sorts_and_limits() {
        let store = MemoryStore::new();
        for date in ["2026-03-01", "2026-03-03", "2026-03-02"] {
            store
                .insert_one("attendance", &json!({"date": date}))
                .await
                .unwrap();
        }

        let newest = store
            .find("attendance", &Filter::new(), Some(&Sort::desc("date")), Some(2))
            .await
            .unwrap();
        assert_eq!(newest.len(), 2);
        assert_eq!(newest[0]["date"], json!("2026-03-03"));
        assert_eq!(newest[1]["date"], json!("2026-03-02"));
    }

    #[actix_web::test]
    async fn update_one_merges_top_level_fields() {
        let store = MemoryStore::new();
        store
            .insert_one("late_approvals", &json!({"id": "a1", "status": "pending"}))
            .await
            .unwrap();

        let touched = store
            .update_one(
                "late_approvals",
                &filter_eq([("id", json!("a1"))]),
                &json!({"status": "approved", "approved_by": "admin-1"}),
            )
            .await
            .unwrap();
        assert_eq!(touched, 1);

        let doc = store
            .find_one("late_approvals", &filter_eq([("id", json!("a1"))]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["status"], json!("approved"));
        assert_eq!(doc["approved_by"], json!("admin-1"));
    }

    #[actix_web::test]
    async fn delete_many_and_count() {
        let store = MemoryStore::new();
        for user in ["u1", "u1", "u2"] {
            store
                .insert_one("attendance", &json!({"user_id": user}))
                .await
                .unwrap();
        }

        let total = store
            .count_documents("attendance", &Filter::new())
            .await
            .unwrap();
        assert_eq!(total, 3);

        let deleted = store
            .delete_many("attendance", &filter_eq([("user_id", json!("u1"))]))
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(
            store.count_documents("attendance", &Filter::new()).await.unwrap(),
            1
        );
    }
}
