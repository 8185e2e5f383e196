pub mod approval;
pub mod permission;
pub mod punch;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::error::AppError;
use crate::model::approval::ApprovalStatus;
use crate::store::{DocumentStore, Filter, Sort};

/// Admin verdict applied to a pending approval request or late permission.
#[derive(Debug, Clone)]
pub struct Decision {
    pub status: ApprovalStatus,
    pub approved_by: String,
    pub rejection_reason: Option<String>,
    pub admin_notes: Option<String>,
}

impl Decision {
    /// Decisions may only move a record out of Pending.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.status == ApprovalStatus::Pending {
            return Err(AppError::invalid("status must be approved or rejected"));
        }
        Ok(())
    }
}

/// Serializes read-modify-write on a day aggregate. The store interface has
/// no conditional update, so every writer of an aggregate (punch submission
/// and the approval punch-tagging path) must go through the same per
/// (user, day) slot or one write silently overwrites the other.
///
/// Entries are evicted once the last holder releases, so the map is bounded
/// by the number of in-flight writes rather than growing one entry per
/// (user, day) forever.
#[derive(Default)]
pub struct DayLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DayLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the (user, day) slot is free and holds it until the
    /// returned guard drops.
    pub(crate) async fn acquire(&self, user_id: &str, date: &str) -> DayGuard<'_> {
        let key = format!("{user_id}:{date}");
        let slot = {
            let mut map = self.locks.lock().unwrap();
            map.entry(key.clone()).or_default().clone()
        };
        let held = slot.lock_owned().await;
        DayGuard { locks: self, key, held: Some(held) }
    }

    /// Number of (user, day) slots currently tracked.
    pub(crate) fn in_flight(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}

pub(crate) struct DayGuard<'a> {
    locks: &'a DayLocks,
    key: String,
    held: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for DayGuard<'_> {
    fn drop(&mut self) {
        // Release the slot before inspecting the map, so the entry's count
        // is the map's own reference plus any queued waiters.
        self.held.take();
        let mut map = self.locks.locks.lock().unwrap();
        if let Some(slot) = map.get(&self.key) {
            if Arc::strong_count(slot) == 1 {
                map.remove(&self.key);
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

/// Paginates over the document-store interface, which exposes `limit` but no
/// offset: fetch `page * per_page` and slice the final window. A page of 0
/// is read as the first page.
pub(crate) async fn paged_find(
    store: &dyn DocumentStore,
    collection: &str,
    filter: &Filter,
    sort: &Sort,
    page: u64,
    per_page: u64,
) -> Result<(Vec<serde_json::Value>, u64), AppError> {
    let page = page.max(1);
    let total = store.count_documents(collection, filter).await?;
    let fetched = store
        .find(
            collection,
            filter,
            Some(sort),
            Some(page.saturating_mul(per_page)),
        )
        .await?;
    let skip = (page - 1).saturating_mul(per_page) as usize;
    let window = fetched.into_iter().skip(skip).collect();
    Ok((window, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[actix_web::test]
    async fn day_lock_slot_is_evicted_once_released() {
        let locks = DayLocks::new();

        let guard = locks.acquire("emp-1", "2026-03-02").await;
        assert_eq!(locks.in_flight(), 1);
        drop(guard);
        assert_eq!(locks.in_flight(), 0);
    }

    #[actix_web::test]
    async fn day_locks_track_distinct_days_independently() {
        let locks = DayLocks::new();

        let a = locks.acquire("emp-1", "2026-03-02").await;
        let b = locks.acquire("emp-1", "2026-03-03").await;
        let c = locks.acquire("emp-2", "2026-03-02").await;
        assert_eq!(locks.in_flight(), 3);

        drop(b);
        assert_eq!(locks.in_flight(), 2);
        drop(a);
        drop(c);
        assert_eq!(locks.in_flight(), 0);
    }

    #[actix_web::test]
    async fn page_zero_is_read_as_the_first_page() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store
                .insert_one("items", &json!({"id": format!("i{i}"), "rank": i}))
                .await
                .unwrap();
        }

        let (window, total) = paged_find(
            &store,
            "items",
            &Filter::new(),
            &Sort::desc("rank"),
            0,
            2,
        )
        .await
        .unwrap();

        assert_eq!(total, 3);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0]["id"], json!("i2"));
    }
}
