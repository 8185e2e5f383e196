//! Late-approval workflow.
//!
//! A late IN punch always opens a `LateApprovalRequest`. If an approved
//! `LatePermission` already covers that date the request is created directly
//! in Approved and nobody is bothered; otherwise it is Pending and every
//! admin is notified. Approved/Rejected are terminal.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{DayLocks, Decision, Page, paged_find};
use crate::error::AppError;
use crate::model::approval::{ApprovalStatus, LateApprovalRequest};
use crate::model::attendance::AttendanceAggregate;
use crate::model::permission::LatePermission;
use crate::notify::Notifier;
use crate::policy::format_minutes;
use crate::store::{DocumentStore, Filter, Sort, collections, decode, filter_eq};
use crate::ws::{Broadcast, DataType};

pub struct ApprovalService {
    store: Arc<dyn DocumentStore>,
    registry: Arc<dyn Broadcast>,
    notifier: Arc<Notifier>,
    /// Shared with punch submission: both paths rewrite the day aggregate.
    day_locks: Arc<DayLocks>,
}

impl ApprovalService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        registry: Arc<dyn Broadcast>,
        notifier: Arc<Notifier>,
        day_locks: Arc<DayLocks>,
    ) -> Self {
        ApprovalService { store, registry, notifier, day_locks }
    }

    /// Opens the approval workflow for a late IN punch. Auto-approves when a
    /// matching approved permission exists for that date; otherwise creates
    /// the request Pending and fans out to admins.
    pub async fn open_for_late_punch(
        &self,
        user_id: &str,
        attendance_id: &str,
        punch_ts: DateTime<Utc>,
        late_by_minutes: i64,
        date: &str,
    ) -> Result<LateApprovalRequest, AppError> {
        let permission = self
            .store
            .find_one(
                collections::LATE_PERMISSIONS,
                &filter_eq([
                    ("user_id", json!(user_id)),
                    ("date", json!(date)),
                    ("status", json!(ApprovalStatus::Approved)),
                ]),
            )
            .await?
            .map(decode::<LatePermission>)
            .transpose()?;

        let now = Utc::now();
        let has_permission = permission.is_some();
        let request = LateApprovalRequest {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            attendance_id: attendance_id.to_string(),
            punch_ts,
            date: date.to_string(),
            late_by_minutes,
            has_permission,
            permission_id: permission.map(|p| p.id),
            status: if has_permission {
                ApprovalStatus::Approved
            } else {
                ApprovalStatus::Pending
            },
            requested_at: now,
            approved_by: None,
            approved_at: if has_permission { Some(now) } else { None },
            rejection_reason: None,
            admin_notes: None,
        };

        let doc = serde_json::to_value(&request).map_err(crate::store::StoreError::from)?;
        self.store
            .insert_one(collections::LATE_APPROVALS, &doc)
            .await?;

        if request.status == ApprovalStatus::Pending {
            let message = format!(
                "{} arrived late by {} on {} and needs approval",
                user_id,
                format_minutes(late_by_minutes),
                date
            );
            self.notifier
                .notify_admins(
                    user_id,
                    "late-approval",
                    "Late arrival needs approval",
                    &message,
                    json!({"approval_id": request.id, "date": date}),
                )
                .await;
            self.registry
                .broadcast_update(DataType::LateApproval, doc)
                .await;
        }

        Ok(request)
    }

    /// Applies an admin decision. Valid only from Pending; deciding a request
    /// that is already terminal fails with Conflict.
    pub async fn decide(&self, id: &str, decision: Decision) -> Result<LateApprovalRequest, AppError> {
        decision.validate()?;

        let id_filter = filter_eq([("id", json!(id))]);
        let doc = self
            .store
            .find_one(collections::LATE_APPROVALS, &id_filter)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Approval request {id} not found")))?;
        let mut request: LateApprovalRequest = decode(doc)?;

        if request.status != ApprovalStatus::Pending {
            return Err(AppError::conflict(format!(
                "Approval request already {}",
                request.status
            )));
        }

        request.status = decision.status;
        request.approved_by = Some(decision.approved_by);
        request.approved_at = Some(Utc::now());
        request.rejection_reason = decision.rejection_reason;
        request.admin_notes = decision.admin_notes;

        self.store
            .update_one(
                collections::LATE_APPROVALS,
                &id_filter,
                &json!({
                    "status": request.status,
                    "approved_by": request.approved_by,
                    "approved_at": request.approved_at,
                    "rejection_reason": request.rejection_reason,
                    "admin_notes": request.admin_notes,
                }),
            )
            .await?;

        // The decision is committed; tagging the punch is a side effect and
        // must not turn an applied decision into an error for the caller.
        if request.status == ApprovalStatus::Approved {
            if let Err(e) = self.tag_attendance_punch(&request).await {
                tracing::warn!(
                    error = %e,
                    approval_id = %request.id,
                    "punch tagging failed after approval"
                );
            }
        }

        let doc = serde_json::to_value(&request).map_err(crate::store::StoreError::from)?;
        self.registry
            .broadcast_update(DataType::LateApproval, doc)
            .await;

        self.mark_notifications_read(&request.id).await;

        Ok(request)
    }

    pub async fn list(
        &self,
        user_id: Option<&str>,
        status: Option<ApprovalStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<Page<LateApprovalRequest>, AppError> {
        let mut filter = Filter::new();
        if let Some(user_id) = user_id {
            filter.insert("user_id".to_string(), json!(user_id));
        }
        if let Some(status) = status {
            filter.insert("status".to_string(), json!(status));
        }

        let (docs, total) = paged_find(
            self.store.as_ref(),
            collections::LATE_APPROVALS,
            &filter,
            &Sort::desc("requested_at"),
            page,
            per_page,
        )
        .await?;

        let data = docs
            .into_iter()
            .map(decode::<LateApprovalRequest>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page { data, page, per_page, total })
    }

    /// Writes the non-authoritative approved tag onto the punch that opened
    /// this request and rebroadcasts the aggregate. Runs under the same day
    /// lock as punch submission, so a punch landing concurrently cannot be
    /// overwritten by this read-modify-write.
    async fn tag_attendance_punch(&self, request: &LateApprovalRequest) -> Result<(), AppError> {
        let id_filter = filter_eq([("id", json!(request.attendance_id))]);

        let aggregate = {
            let _guard = self.day_locks.acquire(&request.user_id, &request.date).await;

            let Some(doc) = self
                .store
                .find_one(collections::ATTENDANCE, &id_filter)
                .await?
            else {
                // Aggregate may have been bulk-cleared since the punch landed.
                tracing::warn!(
                    attendance_id = %request.attendance_id,
                    approval_id = %request.id,
                    "attendance aggregate missing, skipping punch tag"
                );
                return Ok(());
            };

            let mut aggregate: AttendanceAggregate = decode(doc)?;
            if let Some(punch) = aggregate
                .punches
                .iter_mut()
                .find(|p| p.late_approval_id.as_deref() == Some(request.id.as_str()))
            {
                punch.late_approval_status = Some(ApprovalStatus::Approved);
            }

            self.store
                .update_one(
                    collections::ATTENDANCE,
                    &id_filter,
                    &json!({"punches": aggregate.punches}),
                )
                .await?;
            aggregate
        };

        match serde_json::to_value(&aggregate) {
            Ok(doc) => self.registry.broadcast_update(DataType::Attendance, doc).await,
            Err(e) => tracing::warn!(error = %e, "aggregate rebroadcast skipped"),
        }
        Ok(())
    }

    /// Flips `read` on notifications referencing this approval. Best-effort.
    async fn mark_notifications_read(&self, approval_id: &str) {
        let filter = filter_eq([
            ("data.approval_id", json!(approval_id)),
            ("read", Value::Bool(false)),
        ]);
        let found = self
            .store
            .find(collections::NOTIFICATIONS, &filter, None, None)
            .await;

        let docs = match found {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, approval_id, "notification lookup failed");
                return;
            }
        };

        for doc in docs {
            let Some(notification_id) = doc.get("id").and_then(Value::as_str) else {
                continue;
            };
            let result = self
                .store
                .update_one(
                    collections::NOTIFICATIONS,
                    &filter_eq([("id", json!(notification_id))]),
                    &json!({"read": true}),
                )
                .await;
            if let Err(e) = result {
                tracing::warn!(error = %e, notification_id, "failed to mark notification read");
            }
        }
    }
}
