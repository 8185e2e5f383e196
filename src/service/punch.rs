//! Punch submission state machine.
//!
//! A punch is validated, classified against the shift schedule, appended to
//! the day's aggregate, totals are recomputed from the full history, and the
//! result is persisted and broadcast. A late IN additionally opens the
//! late-approval workflow before the punch is finalized; that step is
//! best-effort and never blocks the punch itself.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde_json::json;

use super::DayLocks;
use super::approval::ApprovalService;
use crate::error::AppError;
use crate::model::approval::ApprovalStatus;
use crate::model::attendance::{AttendanceAggregate, Punch, PunchKind, Punctuality};
use crate::notify::Notifier;
use crate::policy::ShiftSchedule;
use crate::store::{DocumentStore, Sort, collections, decode, filter_eq};
use crate::ws::{Broadcast, DataType};

pub struct PunchRequest {
    pub user_id: String,
    pub kind: PunchKind,
    pub manual: bool,
    pub manual_actor: Option<String>,
    pub reason: Option<String>,
    pub custom_time: Option<DateTime<Utc>>,
}

pub struct PunchService {
    store: Arc<dyn DocumentStore>,
    registry: Arc<dyn Broadcast>,
    notifier: Arc<Notifier>,
    approvals: Arc<ApprovalService>,
    schedule: ShiftSchedule,
    /// Shared with the approval service, which rewrites the aggregate when
    /// it tags an approved punch.
    day_locks: Arc<DayLocks>,
}

impl PunchService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        registry: Arc<dyn Broadcast>,
        notifier: Arc<Notifier>,
        approvals: Arc<ApprovalService>,
        schedule: ShiftSchedule,
        day_locks: Arc<DayLocks>,
    ) -> Self {
        PunchService {
            store,
            registry,
            notifier,
            approvals,
            schedule,
            day_locks,
        }
    }

    pub async fn submit_punch(&self, req: PunchRequest) -> Result<AttendanceAggregate, AppError> {
        if req.user_id.trim().is_empty() {
            return Err(AppError::invalid("user_id is required"));
        }

        let now = Utc::now();
        let ts = req.custom_time.unwrap_or(now);
        let local = ts.with_timezone(&Local);
        let date = local.format("%Y-%m-%d").to_string();

        let _guard = self.day_locks.acquire(&req.user_id, &date).await;

        let mut aggregate = self.load_or_create(&req.user_id, &date).await?;

        let mut punch = Punch {
            ts,
            kind: req.kind,
            manual: req.manual,
            manual_actor: req.manual_actor.clone(),
            reason: req.reason.clone(),
            classification: None,
            classification_detail: None,
            late_approval_id: None,
            late_approval_status: None,
        };

        match req.kind {
            PunchKind::In => {
                let verdict = self.schedule.classify_check_in(local.time());
                punch.classification = Some(verdict.status);
                punch.classification_detail = Some(verdict.message);

                if verdict.status == Punctuality::Late && verdict.minutes_diff > 0 {
                    // Approval creation must not abort the punch.
                    match self
                        .approvals
                        .open_for_late_punch(
                            &req.user_id,
                            &aggregate.id,
                            ts,
                            verdict.minutes_diff,
                            &date,
                        )
                        .await
                    {
                        Ok(request) => {
                            if request.status == ApprovalStatus::Approved {
                                punch.late_approval_status = Some(ApprovalStatus::Approved);
                            }
                            punch.late_approval_id = Some(request.id);
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                user_id = %req.user_id,
                                "late approval creation failed, punch continues unlinked"
                            );
                        }
                    }
                }
            }
            PunchKind::Out => {
                let verdict = self.schedule.classify_check_out(local.time());
                punch.classification = Some(verdict.status);
                punch.classification_detail = Some(verdict.message);
            }
            // Break punches are never classified.
            PunchKind::BreakStart | PunchKind::BreakEnd => {}
        }

        aggregate.punches.push(punch);
        aggregate.recompute_totals(now);
        self.persist(&aggregate).await?;
        drop(_guard);

        if !req.manual {
            let message = format!(
                "{} punched {} at {}",
                req.user_id,
                req.kind,
                local.format("%H:%M")
            );
            self.notifier
                .notify_admins(
                    &req.user_id,
                    "attendance",
                    "Attendance update",
                    &message,
                    json!({"attendance_id": aggregate.id, "date": date}),
                )
                .await;

            match serde_json::to_value(&aggregate) {
                Ok(doc) => self.registry.broadcast_update(DataType::Attendance, doc).await,
                Err(e) => tracing::warn!(error = %e, "aggregate broadcast skipped"),
            }
        }

        Ok(aggregate)
    }

    /// Creation happens under the day lock, so concurrent first punches of
    /// the day converge on one aggregate.
    async fn load_or_create(&self, user_id: &str, date: &str) -> Result<AttendanceAggregate, AppError> {
        let filter = filter_eq([("user_id", json!(user_id)), ("date", json!(date))]);
        if let Some(doc) = self.store.find_one(collections::ATTENDANCE, &filter).await? {
            return Ok(decode(doc)?);
        }

        let aggregate = AttendanceAggregate::new(user_id, date);
        let doc = serde_json::to_value(&aggregate).map_err(crate::store::StoreError::from)?;
        self.store.insert_one(collections::ATTENDANCE, &doc).await?;
        Ok(aggregate)
    }

    async fn persist(&self, aggregate: &AttendanceAggregate) -> Result<(), AppError> {
        self.store
            .update_one(
                collections::ATTENDANCE,
                &filter_eq([("id", json!(aggregate.id))]),
                &json!({
                    "punches": aggregate.punches,
                    "work_minutes": aggregate.work_minutes,
                    "break_minutes": aggregate.break_minutes,
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn today(&self, user_id: &str) -> Result<Option<AttendanceAggregate>, AppError> {
        let date = Local::now().format("%Y-%m-%d").to_string();
        let doc = self
            .store
            .find_one(
                collections::ATTENDANCE,
                &filter_eq([("user_id", json!(user_id)), ("date", json!(date))]),
            )
            .await?;
        Ok(doc.map(decode).transpose()?)
    }

    pub async fn history(&self, user_id: &str, limit: u64) -> Result<Vec<AttendanceAggregate>, AppError> {
        let docs = self
            .store
            .find(
                collections::ATTENDANCE,
                &filter_eq([("user_id", json!(user_id))]),
                Some(&Sort::desc("date")),
                Some(limit),
            )
            .await?;
        Ok(docs
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Admin maintenance: wipes every aggregate.
    pub async fn clear_all(&self) -> Result<u64, AppError> {
        Ok(self
            .store
            .delete_many(collections::ATTENDANCE, &Default::default())
            .await?)
    }
}
