use std::str::FromStr;

use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::model::attendance::{AttendanceAggregate, PunchKind};
use crate::service::punch::{PunchRequest, PunchService};

#[derive(Deserialize, ToSchema)]
pub struct PunchBody {
    #[schema(example = "emp-1024")]
    pub user_id: Option<String>,

    /// IN, OUT, BREAK_START or BREAK_END
    #[serde(rename = "type")]
    #[schema(example = "IN")]
    pub kind: Option<String>,

    /// Set when an admin records the punch on the employee's behalf.
    pub manual: Option<bool>,

    #[schema(example = "admin-1")]
    pub manual_actor: Option<String>,

    #[schema(example = "Forgot badge at home")]
    pub reason: Option<String>,

    /// Overrides "now" as the punch instant (manual corrections).
    #[schema(value_type = Option<String>, format = "date-time")]
    pub custom_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Maximum number of days returned (newest first), capped at 100.
    pub limit: Option<u64>,
}

/// Punch submission endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/punch",
    request_body(
        content = PunchBody,
        description = "Punch payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Punch recorded, updated aggregate returned",
         body = AttendanceAggregate),
        (status = 400, description = "Missing user_id or unknown punch type", body = Object, example = json!({
            "message": "type is required"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn punch(
    service: web::Data<PunchService>,
    payload: web::Json<PunchBody>,
) -> Result<impl Responder, AppError> {
    let body = payload.into_inner();

    let user_id = body
        .user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::invalid("user_id is required"))?;
    let kind = body
        .kind
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| AppError::invalid("type is required"))?;
    let kind = PunchKind::from_str(&kind)
        .map_err(|_| AppError::invalid("type must be IN, OUT, BREAK_START or BREAK_END"))?;

    let aggregate = service
        .submit_punch(PunchRequest {
            user_id,
            kind,
            manual: body.manual.unwrap_or(false),
            manual_actor: body.manual_actor,
            reason: body.reason,
            custom_time: body.custom_time,
        })
        .await?;

    Ok(HttpResponse::Ok().json(aggregate))
}

/// Today's aggregate for a user
#[utoipa::path(
    get,
    path = "/api/attendance/today/{user_id}",
    params(
        ("user_id" = String, Path, description = "User to look up")
    ),
    responses(
        (status = 200, description = "Today's aggregate, or null when no punch landed yet",
         body = AttendanceAggregate),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn today(
    service: web::Data<PunchService>,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let user_id = path.into_inner();
    let aggregate = service.today(&user_id).await?;
    Ok(HttpResponse::Ok().json(aggregate))
}

/// Attendance history for a user, newest day first
#[utoipa::path(
    get,
    path = "/api/attendance/history/{user_id}",
    params(
        ("user_id" = String, Path, description = "User to look up"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Day aggregates, newest first",
         body = Vec<AttendanceAggregate>),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn history(
    service: web::Data<PunchService>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> Result<impl Responder, AppError> {
    let user_id = path.into_inner();
    let limit = query.limit.unwrap_or(30).min(100);
    let days = service.history(&user_id, limit).await?;
    Ok(HttpResponse::Ok().json(days))
}

/// Bulk-clear all attendance records (admin maintenance)
#[utoipa::path(
    delete,
    path = "/api/attendance",
    responses(
        (status = 200, description = "All attendance records deleted", body = Object, example = json!({
            "message": "Attendance cleared",
            "deleted": 42
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn clear(service: web::Data<PunchService>) -> Result<impl Responder, AppError> {
    let deleted = service.clear_all().await?;
    tracing::info!(deleted, "attendance records bulk-cleared");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Attendance cleared",
        "deleted": deleted
    })))
}
