use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Shared lifecycle for approval requests and late permissions.
/// Approved and Rejected are terminal; only Pending accepts a decision.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// One request per late IN punch lacking same-day pre-approval.
/// Created directly in Approved when a matching permission already exists.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LateApprovalRequest {
    #[schema(example = "8f1c9a4e-0000-4000-8000-000000000000")]
    pub id: String,

    #[schema(example = "emp-1024")]
    pub user_id: String,

    /// Id of the attendance aggregate holding the late punch.
    pub attendance_id: String,

    /// Timestamp of the late punch, used as the correlation key back into
    /// the aggregate's punch sequence.
    #[schema(value_type = String, format = "date-time")]
    pub punch_ts: DateTime<Utc>,

    #[schema(example = "2026-03-02")]
    pub date: String,

    #[schema(example = 25)]
    pub late_by_minutes: i64,

    pub has_permission: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_id: Option<String>,

    pub status: ApprovalStatus,

    #[schema(value_type = String, format = "date-time")]
    pub requested_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}
