use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// In-app notification record written by the fan-out. Read-toggling and
/// deletion belong to the notification collaborator; this service only
/// creates records and flips `read` when an approval is decided.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: String,

    #[serde(rename = "type")]
    #[schema(example = "late-approval")]
    pub kind: String,

    pub title: String,
    pub message: String,

    /// Actor that caused the notification.
    pub user_id: String,

    /// Recipient.
    pub target_user_id: String,

    pub read: bool,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Value,
}
