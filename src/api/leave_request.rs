use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::PageQuery;
use crate::auth::auth::AuthUser;
use crate::clock::Clock;
use crate::config::Config;
use crate::engine::leave::LeaveApplication;
use crate::error::AppError;
use crate::model::employee::EmpId;
use crate::model::leave_request::{ApprovalStatus, LeaveRequest, LeaveType};
use crate::service::leave::{self as leave_service, leave_read_filter};
use crate::service::notify::Notifier;
use crate::store::{self, leave::LeaveFilter};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyLeave {
    #[schema(value_type = String, format = "date", example = "2025-12-08")]
    pub from_date: NaiveDate,
    #[schema(value_type = String, format = "date", example = "2025-12-09")]
    pub to_date: NaiveDate,
    pub leave_type: LeaveType,
    #[serde(default)]
    pub half_from: bool,
    #[serde(default)]
    pub half_to: bool,
    pub reason: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: u64,
}

#[utoipa::path(
    post,
    path = "/api/leaves",
    request_body = ApplyLeave,
    responses(
        (status = 201, description = "Leave applied", body = CreatedResponse),
        (status = 400, description = "Invalid range, overlap or zero working days"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn apply(auth: AuthUser, pool: web::Data<MySqlPool>, body: web::Json<ApplyLeave>) -> actix_web::Result<impl Responder> {
    let empid = auth.require_empid()?;
    let body = body.into_inner();
    let application = LeaveApplication {
        from: body.from_date,
        to: body.to_date,
        leave_type: body.leave_type,
        half_from: body.half_from,
        half_to: body.half_to,
    };

    let id = leave_service::apply_leave(pool.get_ref(), empid, application, body.reason.as_deref()).await?;
    Ok(HttpResponse::Created().json(CreatedResponse { id }))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LeaveQuery {
    pub empid: Option<EmpId>,
    pub status: Option<ApprovalStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedLeaveResponse {
    pub data: Vec<LeaveRequest>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/api/leaves",
    params(LeaveQuery),
    responses(
        (status = 200, description = "Leave requests", body = PaginatedLeaveResponse),
        (status = 403, description = "Not allowed to read these rows")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<LeaveQuery>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();
    let paging = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve(&config);
    let filter = LeaveFilter {
        visibility: leave_read_filter(&auth, query.empid)?,
        status: query.status,
    };

    let total = store::leave::count(pool.get_ref(), &filter).await?;
    let data = store::leave::list(pool.get_ref(), &filter, paging.per_page, paging.offset).await?;

    Ok(HttpResponse::Ok().json(PaginatedLeaveResponse {
        data,
        page: paging.page,
        per_page: paging.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/leaves/{id}",
    params(("id" = u64, Path, description = "Leave id")),
    responses(
        (status = 200, description = "Leave request", body = LeaveRequest),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get(auth: AuthUser, pool: web::Data<MySqlPool>, path: web::Path<u64>) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    let not_found = || AppError::not_found(format!("leave {id} not found"));
    let leave = store::leave::find(pool.get_ref(), id).await?.ok_or_else(not_found)?;

    let visibility = leave_read_filter(&auth, None).map_err(|_| not_found())?;
    let owner_manager = match &visibility.team_of {
        Some(_) => store::employee::find(pool.get_ref(), &leave.empid)
            .await?
            .and_then(|e| e.manager_empid),
        None => None,
    };
    if !visibility.admits(&leave.empid, owner_manager.as_ref()) {
        return Err(not_found().into());
    }

    Ok(HttpResponse::Ok().json(leave))
}

async fn decide(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    notifier: web::Data<dyn Notifier>,
    id: u64,
    approve: bool,
) -> actix_web::Result<HttpResponse> {
    let leave = leave_service::decide_leave(pool.get_ref(), clock.get_ref(), notifier.into_inner(), &auth, id, approve).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    put,
    path = "/api/leaves/{id}/approve",
    params(("id" = u64, Path, description = "Leave id")),
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 403, description = "Not this applicant's approver"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already decided, or own leave")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    notifier: web::Data<dyn Notifier>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide(auth, pool, clock, notifier, path.into_inner(), true).await
}

#[utoipa::path(
    put,
    path = "/api/leaves/{id}/reject",
    params(("id" = u64, Path, description = "Leave id")),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 403, description = "Not this applicant's approver"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already decided, or own leave")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    notifier: web::Data<dyn Notifier>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide(auth, pool, clock, notifier, path.into_inner(), false).await
}
