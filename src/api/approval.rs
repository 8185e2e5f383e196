use std::str::FromStr;

use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::model::approval::{ApprovalStatus, LateApprovalRequest};
use crate::service::Decision;
use crate::service::approval::ApprovalService;

#[derive(Deserialize, ToSchema)]
pub struct DecisionBody {
    #[schema(example = "approved")]
    pub status: Option<String>,

    #[schema(example = "admin-1")]
    pub approved_by: Option<String>,

    #[schema(example = "No prior notice")]
    pub rejection_reason: Option<String>,

    #[schema(example = "Second time this month")]
    pub admin_notes: Option<String>,
}

impl DecisionBody {
    pub fn into_decision(self) -> Result<Decision, AppError> {
        let status = self
            .status
            .ok_or_else(|| AppError::invalid("status is required"))?;
        let status = ApprovalStatus::from_str(&status)
            .map_err(|_| AppError::invalid("status must be approved or rejected"))?;
        let approved_by = self
            .approved_by
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| AppError::invalid("approved_by is required"))?;

        Ok(Decision {
            status,
            approved_by,
            rejection_reason: self.rejection_reason,
            admin_notes: self.admin_notes,
        })
    }
}

#[derive(Deserialize, IntoParams)]
pub struct ApprovalFilter {
    /// Filter by employee
    #[param(example = "emp-1024")]
    pub user_id: Option<String>,
    /// Filter by request status
    #[param(example = "pending")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct ApprovalListResponse {
    pub data: Vec<LateApprovalRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: u64,
}

pub(super) fn parse_status(raw: Option<&str>) -> Result<Option<ApprovalStatus>, AppError> {
    raw.map(|s| {
        ApprovalStatus::from_str(s)
            .map_err(|_| AppError::invalid("status must be pending, approved or rejected"))
    })
    .transpose()
}

/* =========================
List approval requests (admin)
========================= */
#[utoipa::path(
    get,
    path = "/api/approvals",
    params(ApprovalFilter),
    responses(
        (status = 200, description = "Paginated approval request list", body = ApprovalListResponse),
        (status = 400, description = "Bad status filter"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Late Approval"
)]
pub async fn list(
    service: web::Data<ApprovalService>,
    query: web::Query<ApprovalFilter>,
) -> Result<impl Responder, AppError> {
    let query = query.into_inner();
    let status = parse_status(query.status.as_deref())?;
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);

    let listed = service
        .list(query.user_id.as_deref(), status, page, per_page)
        .await?;

    Ok(HttpResponse::Ok().json(ApprovalListResponse {
        data: listed.data,
        page: listed.page,
        per_page: listed.per_page,
        total: listed.total,
    }))
}

/* =========================
Decide approval request (admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/approvals/{id}/status",
    params(
        ("id" = String, Path, description = "Approval request id")
    ),
    request_body(
        content = DecisionBody,
        description = "Admin decision",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Decision applied", body = LateApprovalRequest),
        (status = 400, description = "Bad decision payload"),
        (status = 404, description = "Approval request not found", body = Object, example = json!({
            "message": "Approval request a1 not found"
        })),
        (status = 409, description = "Request already decided", body = Object, example = json!({
            "message": "Approval request already approved"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Late Approval"
)]
pub async fn decide(
    service: web::Data<ApprovalService>,
    path: web::Path<String>,
    payload: web::Json<DecisionBody>,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();
    let decision = payload.into_inner().into_decision()?;
    let request = service.decide(&id, decision).await?;
    Ok(HttpResponse::Ok().json(request))
}
