use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::approval::{DecisionBody, parse_status};
use crate::error::AppError;
use crate::model::permission::LatePermission;
use crate::service::permission::{PermissionRequest, PermissionService};

#[derive(Deserialize, ToSchema)]
pub struct CreatePermission {
    #[schema(example = "emp-1024")]
    pub user_id: Option<String>,

    #[schema(example = "2026-03-02", format = "date")]
    pub date: Option<String>,

    #[schema(example = "Dentist appointment")]
    pub reason: Option<String>,

    #[schema(example = "10:30")]
    pub expected_arrival_time: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct PermissionFilter {
    /// Filter by employee
    #[param(example = "emp-1024")]
    pub user_id: Option<String>,
    /// Filter by permission status
    #[param(example = "pending")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct PermissionListResponse {
    pub data: Vec<LatePermission>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: u64,
}

/* =========================
Request a late permission
========================= */
#[utoipa::path(
    post,
    path = "/api/permissions",
    request_body(
        content = CreatePermission,
        description = "Late permission payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Permission requested", body = LatePermission),
        (status = 400, description = "Missing or malformed field"),
        (status = 409, description = "Permission already exists for this date", body = Object, example = json!({
            "message": "A late permission already exists for emp-1024 on 2026-03-02"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Late Permission"
)]
pub async fn create(
    service: web::Data<PermissionService>,
    payload: web::Json<CreatePermission>,
) -> Result<impl Responder, AppError> {
    let body = payload.into_inner();

    let permission = service
        .request(PermissionRequest {
            user_id: body
                .user_id
                .ok_or_else(|| AppError::invalid("user_id is required"))?,
            date: body.date.ok_or_else(|| AppError::invalid("date is required"))?,
            reason: body
                .reason
                .ok_or_else(|| AppError::invalid("reason is required"))?,
            expected_arrival_time: body.expected_arrival_time,
        })
        .await?;

    Ok(HttpResponse::Ok().json(permission))
}

/* =========================
List late permissions (admin)
========================= */
#[utoipa::path(
    get,
    path = "/api/permissions",
    params(PermissionFilter),
    responses(
        (status = 200, description = "Paginated late permission list", body = PermissionListResponse),
        (status = 400, description = "Bad status filter"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Late Permission"
)]
pub async fn list(
    service: web::Data<PermissionService>,
    query: web::Query<PermissionFilter>,
) -> Result<impl Responder, AppError> {
    let query = query.into_inner();
    let status = parse_status(query.status.as_deref())?;
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);

    let listed = service
        .list(query.user_id.as_deref(), status, page, per_page)
        .await?;

    Ok(HttpResponse::Ok().json(PermissionListResponse {
        data: listed.data,
        page: listed.page,
        per_page: listed.per_page,
        total: listed.total,
    }))
}

/* =========================
Decide late permission (admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/permissions/{id}/status",
    params(
        ("id" = String, Path, description = "Late permission id")
    ),
    request_body(
        content = DecisionBody,
        description = "Admin decision",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Decision applied", body = LatePermission),
        (status = 400, description = "Bad decision payload"),
        (status = 404, description = "Late permission not found"),
        (status = 409, description = "Permission already decided", body = Object, example = json!({
            "message": "Late permission already approved"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Late Permission"
)]
pub async fn decide(
    service: web::Data<PermissionService>,
    path: web::Path<String>,
    payload: web::Json<DecisionBody>,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();
    let decision = payload.into_inner().into_decision()?;
    let permission = service.decide(&id, decision).await?;
    Ok(HttpResponse::Ok().json(permission))
}
