use crate::api::approval::{ApprovalListResponse, DecisionBody};
use crate::api::attendance::PunchBody;
use crate::api::permission::{CreatePermission, PermissionListResponse};
use crate::model::approval::{ApprovalStatus, LateApprovalRequest};
use crate::model::attendance::{
    AttendanceAggregate, Punch, PunchKind, Punctuality, Totals,
};
use crate::model::notification::Notification;
use crate::model::permission::LatePermission;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Service API",
        version = "1.0.0",
        description = r#"
## Real-time Attendance & Late-Approval Service

Staff punch in and out, punches are classified against the store schedule,
and late arrivals flow through an admin approval pipeline.

### 🔹 Key Features
- **Punch tracking**
  - IN / OUT / BREAK_START / BREAK_END with derived work & break totals
- **Punctuality classification**
  - On-time window, late arrivals, early checkouts, overtime
- **Late-approval workflow**
  - Pending → approved/rejected, with auto-approval from pre-granted permissions
- **Realtime updates**
  - Connected clients receive every state change over `/ws`

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::punch,
        crate::api::attendance::today,
        crate::api::attendance::history,
        crate::api::attendance::clear,

        crate::api::approval::list,
        crate::api::approval::decide,

        crate::api::permission::create,
        crate::api::permission::list,
        crate::api::permission::decide,
    ),
    components(
        schemas(
            PunchBody,
            PunchKind,
            Punctuality,
            Punch,
            Totals,
            AttendanceAggregate,
            ApprovalStatus,
            LateApprovalRequest,
            ApprovalListResponse,
            DecisionBody,
            LatePermission,
            CreatePermission,
            PermissionListResponse,
            Notification
        )
    ),
    tags(
        (name = "Attendance", description = "Punch submission and attendance lookups"),
        (name = "Late Approval", description = "Admin review of late arrivals"),
        (name = "Late Permission", description = "Pre-authorized late-arrival exemptions"),
    )
)]
pub struct ApiDoc;
