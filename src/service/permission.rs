//! Late-permission workflow: pre-authorized exemptions for arriving late on
//! a specific date. Lifecycle is independent from approval requests; the
//! punch path only ever reads permissions.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use super::{Decision, Page, paged_find};
use crate::error::AppError;
use crate::model::approval::ApprovalStatus;
use crate::model::permission::LatePermission;
use crate::notify::Notifier;
use crate::store::{DocumentStore, Filter, Sort, collections, decode, filter_eq};
use crate::ws::{Broadcast, DataType};

pub struct PermissionRequest {
    pub user_id: String,
    pub date: String,
    pub reason: String,
    pub expected_arrival_time: Option<String>,
}

pub struct PermissionService {
    store: Arc<dyn DocumentStore>,
    registry: Arc<dyn Broadcast>,
    notifier: Arc<Notifier>,
}

impl PermissionService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        registry: Arc<dyn Broadcast>,
        notifier: Arc<Notifier>,
    ) -> Self {
        PermissionService { store, registry, notifier }
    }

    /// Creates a Pending permission. At most one permission may exist per
    /// (user, date); duplicates fail with Conflict.
    pub async fn request(&self, req: PermissionRequest) -> Result<LatePermission, AppError> {
        if req.user_id.trim().is_empty() {
            return Err(AppError::invalid("user_id is required"));
        }
        if NaiveDate::parse_from_str(&req.date, "%Y-%m-%d").is_err() {
            return Err(AppError::invalid("date must be formatted YYYY-MM-DD"));
        }
        if req.reason.trim().is_empty() {
            return Err(AppError::invalid("reason is required"));
        }

        let existing = self
            .store
            .find_one(
                collections::LATE_PERMISSIONS,
                &filter_eq([("user_id", json!(req.user_id)), ("date", json!(req.date))]),
            )
            .await?;
        if existing.is_some() {
            return Err(AppError::conflict(format!(
                "A late permission already exists for {} on {}",
                req.user_id, req.date
            )));
        }

        let permission = LatePermission {
            id: Uuid::new_v4().to_string(),
            user_id: req.user_id,
            date: req.date,
            requested_at: Utc::now(),
            reason: req.reason,
            expected_arrival_time: req.expected_arrival_time,
            status: ApprovalStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
        };

        let doc = serde_json::to_value(&permission).map_err(crate::store::StoreError::from)?;
        self.store
            .insert_one(collections::LATE_PERMISSIONS, &doc)
            .await?;

        let message = format!(
            "{} requests permission to arrive late on {}: {}",
            permission.user_id, permission.date, permission.reason
        );
        self.notifier
            .notify_admins(
                &permission.user_id,
                "late-permission",
                "Late permission requested",
                &message,
                json!({"permission_id": permission.id, "date": permission.date}),
            )
            .await;
        self.registry
            .broadcast_update(DataType::LatePermission, doc)
            .await;

        Ok(permission)
    }

    /// Same Pending-only transition discipline as approval requests.
    pub async fn decide(&self, id: &str, decision: Decision) -> Result<LatePermission, AppError> {
        decision.validate()?;

        let id_filter = filter_eq([("id", json!(id))]);
        let doc = self
            .store
            .find_one(collections::LATE_PERMISSIONS, &id_filter)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Late permission {id} not found")))?;
        let mut permission: LatePermission = decode(doc)?;

        if permission.status != ApprovalStatus::Pending {
            return Err(AppError::conflict(format!(
                "Late permission already {}",
                permission.status
            )));
        }

        permission.status = decision.status;
        permission.approved_by = Some(decision.approved_by);
        permission.approved_at = Some(Utc::now());
        permission.rejection_reason = decision.rejection_reason;

        self.store
            .update_one(
                collections::LATE_PERMISSIONS,
                &id_filter,
                &json!({
                    "status": permission.status,
                    "approved_by": permission.approved_by,
                    "approved_at": permission.approved_at,
                    "rejection_reason": permission.rejection_reason,
                }),
            )
            .await?;

        match serde_json::to_value(&permission) {
            Ok(doc) => {
                self.registry
                    .broadcast_update(DataType::LatePermission, doc)
                    .await
            }
            Err(e) => tracing::warn!(error = %e, "permission rebroadcast skipped"),
        }

        Ok(permission)
    }

    pub async fn list(
        &self,
        user_id: Option<&str>,
        status: Option<ApprovalStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<Page<LatePermission>, AppError> {
        let mut filter = Filter::new();
        if let Some(user_id) = user_id {
            filter.insert("user_id".to_string(), json!(user_id));
        }
        if let Some(status) = status {
            filter.insert("status".to_string(), json!(status));
        }

        let (docs, total) = paged_find(
            self.store.as_ref(),
            collections::LATE_PERMISSIONS,
            &filter,
            &Sort::desc("requested_at"),
            page,
            per_page,
        )
        .await?;

        let data = docs
            .into_iter()
            .map(decode::<LatePermission>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page { data, page, per_page, total })
    }
}
