//! Admin notification fan-out.
//!
//! Writes an in-app notification record per recipient and pushes a realtime
//! event to whoever is connected. The admin recipient list is read from the
//! users collection through a short-TTL moka cache; an admin added after the
//! list was read simply misses that one notification.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use moka::future::Cache;
use serde_json::Value;
use uuid::Uuid;

use crate::model::notification::Notification;
use crate::model::user::UserDoc;
use crate::store::{DocumentStore, StoreError, collections, decode, filter_eq};
use crate::ws::{Broadcast, DataType};

const ADMIN_ROLE: &str = "admin";
const ADMIN_CACHE_KEY: &str = "admins";

pub struct Notifier {
    store: Arc<dyn DocumentStore>,
    registry: Arc<dyn Broadcast>,
    admin_cache: Cache<String, Vec<String>>,
}

impl Notifier {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        registry: Arc<dyn Broadcast>,
        admin_cache_ttl: Duration,
    ) -> Self {
        Notifier {
            store,
            registry,
            admin_cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(admin_cache_ttl)
                .build(),
        }
    }

    /// Primes the admin-id cache; spawned from `main` at startup.
    pub async fn warmup(&self) -> anyhow::Result<()> {
        let admins = self.admin_ids().await?;
        log::info!("Admin cache warmup complete: {} admins", admins.len());
        Ok(())
    }

    async fn admin_ids(&self) -> Result<Vec<String>, StoreError> {
        if let Some(ids) = self.admin_cache.get(ADMIN_CACHE_KEY).await {
            return Ok(ids);
        }

        let docs = self
            .store
            .find(
                collections::USERS,
                &filter_eq([("role", Value::String(ADMIN_ROLE.to_string()))]),
                None,
                None,
            )
            .await?;

        let ids: Vec<String> = docs
            .into_iter()
            .filter_map(|doc| decode::<UserDoc>(doc).ok())
            .map(|user| user.id)
            .collect();

        self.admin_cache
            .insert(ADMIN_CACHE_KEY.to_string(), ids.clone())
            .await;
        Ok(ids)
    }

    /// Persists one notification and pushes it to the recipient's live
    /// connections.
    pub async fn notify(
        &self,
        actor: &str,
        target_user_id: &str,
        kind: &str,
        title: &str,
        message: &str,
        data: Value,
    ) -> Result<(), StoreError> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            user_id: actor.to_string(),
            target_user_id: target_user_id.to_string(),
            read: false,
            created_at: Utc::now(),
            data,
        };

        let doc = serde_json::to_value(&notification)?;
        self.store
            .insert_one(collections::NOTIFICATIONS, &doc)
            .await?;
        self.registry
            .push_update(target_user_id, DataType::Notification, doc)
            .await;
        Ok(())
    }

    /// Fans one event out to every admin. Best-effort: failures are logged
    /// per recipient and never reach the caller.
    pub async fn notify_admins(&self, actor: &str, kind: &str, title: &str, message: &str, data: Value) {
        let admins = match self.admin_ids().await {
            Ok(admins) => admins,
            Err(e) => {
                tracing::warn!(error = %e, "admin lookup failed, skipping notification fan-out");
                return;
            }
        };

        let sends = admins
            .iter()
            .map(|admin_id| self.notify(actor, admin_id, kind, title, message, data.clone()));

        for (admin_id, result) in admins.iter().zip(join_all(sends).await) {
            if let Err(e) = result {
                tracing::warn!(error = %e, admin_id, "notification dispatch failed");
            }
        }
    }
}
