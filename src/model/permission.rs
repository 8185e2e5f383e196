use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::approval::ApprovalStatus;

/// Pre-authorized exemption for arriving late on a specific date. At most
/// one per (user, date); consulted read-only when a late IN punch lands.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LatePermission {
    pub id: String,

    #[schema(example = "emp-1024")]
    pub user_id: String,

    #[schema(example = "2026-03-02")]
    pub date: String,

    #[schema(value_type = String, format = "date-time")]
    pub requested_at: DateTime<Utc>,

    #[schema(example = "Dentist appointment")]
    pub reason: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "10:30")]
    pub expected_arrival_time: Option<String>,

    pub status: ApprovalStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}
