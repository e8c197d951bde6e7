use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::{CycleRef, PageQuery};
use crate::auth::auth::AuthUser;
use crate::auth::capability::Capability;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::AppError;
use crate::model::attendance::{AttendanceCycle, AttendanceSummary, DayRecord, PunchKind};
use crate::model::employee::EmpId;
use crate::service::attendance::{self as attendance_service, PunchInput};
use crate::store::attendance::SummaryFilter;
use crate::utils::run_flags::{self, RunKey, RunKind};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PunchReq {
    /// Defaults to `Mobile`.
    pub kind: Option<PunchKind>,
    #[schema(example = "12.9716,77.5946")]
    pub location: Option<String>,
    pub image_ref: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PunchResponse {
    pub punch_id: u64,
    pub day: DayRecord,
}

#[utoipa::path(
    post,
    path = "/api/attendance/punch",
    request_body = PunchReq,
    responses(
        (status = 201, description = "Punch stored", body = PunchResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn punch(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    body: web::Json<PunchReq>,
) -> actix_web::Result<impl Responder> {
    let empid = auth.require_empid()?;
    let body = body.into_inner();
    let input = PunchInput {
        kind: body.kind,
        location: body.location,
        image_ref: body.image_ref,
    };

    let (punch_id, day) = attendance_service::record_punch(pool.get_ref(), clock.get_ref(), empid, input).await?;
    Ok(HttpResponse::Created().json(PunchResponse { punch_id, day }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BuildReq {
    #[schema(example = 12)]
    pub month: u32,
    #[schema(example = 2025)]
    pub year: i32,
    /// Rebuild a single employee instead of the whole cohort.
    pub empid: Option<EmpId>,
}

#[utoipa::path(
    post,
    path = "/api/attendance/build",
    request_body = BuildReq,
    responses(
        (status = 200, description = "Run finished", body = crate::service::RunReport),
        (status = 403, description = "Missing capability"),
        (status = 409, description = "Another run holds the lock, or nothing could be built")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn build(auth: AuthUser, pool: web::Data<MySqlPool>, body: web::Json<BuildReq>) -> actix_web::Result<impl Responder> {
    auth.require(Capability::AttendanceAdmin)?;
    let BuildReq { month, year, empid } = body.into_inner();

    let report = attendance_service::build_attendance(pool.get_ref(), month, year, empid).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[derive(Serialize, ToSchema)]
pub struct CancelResponse {
    pub kind: RunKind,
    pub month: u32,
    pub year: i32,
    /// False when no run was in progress.
    pub cancelled: bool,
}

#[utoipa::path(
    post,
    path = "/api/attendance/build/cancel",
    request_body = CycleRef,
    responses(
        (status = 200, description = "Cancel flag set", body = CancelResponse),
        (status = 403, description = "Missing capability")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn cancel_build(auth: AuthUser, body: web::Json<CycleRef>) -> actix_web::Result<impl Responder> {
    auth.require(Capability::AttendanceAdmin)?;
    let CycleRef { month, year } = body.into_inner();

    let cancelled = run_flags::cancel(RunKey::new(RunKind::Attendance, month, year)).await;
    tracing::info!(month, year, cancelled, by = %auth.username, "Attendance run cancel requested");
    Ok(HttpResponse::Ok().json(CancelResponse {
        kind: RunKind::Attendance,
        month,
        year,
        cancelled,
    }))
}

#[utoipa::path(
    get,
    path = "/api/attendance/cycle",
    responses(
        (status = 200, description = "Current attendance cycle", body = AttendanceCycle),
        (status = 409, description = "Cycle not configured")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn get_cycle(_auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let cycle = attendance_service::get_cycle(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(cycle))
}

#[utoipa::path(
    put,
    path = "/api/attendance/cycle",
    request_body = AttendanceCycle,
    responses(
        (status = 200, description = "Cycle replaced", body = AttendanceCycle),
        (status = 400, description = "Invalid cycle"),
        (status = 403, description = "Missing capability")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn put_cycle(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<AttendanceCycle>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::AttendanceAdmin)?;
    let cycle = attendance_service::update_cycle(pool.get_ref(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cycle))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SummaryQuery {
    #[schema(example = 12)]
    pub month: u32,
    #[schema(example = 2025)]
    pub year: i32,
    pub empid: Option<EmpId>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedSummaryResponse {
    pub data: Vec<AttendanceSummary>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Monthly summaries", body = PaginatedSummaryResponse),
        (status = 403, description = "Not allowed to read these rows")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_summaries(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();
    let scope = auth.read_scope()?;
    let paging = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve(&config);

    let filter = SummaryFilter {
        month: query.month,
        year: query.year,
        empid: scope.narrow(query.empid)?,
        frozen_only: scope.frozen_only(),
    };

    let total = crate::store::attendance::count_summaries(pool.get_ref(), &filter).await?;
    let data = crate::store::attendance::list_summaries(pool.get_ref(), &filter, paging.per_page, paging.offset).await?;

    Ok(HttpResponse::Ok().json(PaginatedSummaryResponse {
        data,
        page: paging.page,
        per_page: paging.per_page,
        total,
    }))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DaysQuery {
    pub month: u32,
    pub year: i32,
    /// Defaults to the caller.
    pub empid: Option<EmpId>,
}

/// Employees see their own calendar; attendance and payroll admins anyone's.
fn day_view_target(auth: &AuthUser, requested: Option<EmpId>) -> Result<EmpId, AppError> {
    let admin = auth.can(Capability::AttendanceAdmin) || auth.can(Capability::PayrollAdmin);
    match requested {
        Some(empid) if admin => Ok(empid),
        Some(empid) if Some(&empid) == auth.empid.as_ref() => Ok(empid),
        Some(empid) => Err(AppError::forbidden(format!("cannot read attendance of employee {empid}"))),
        None => auth.require_empid().cloned(),
    }
}

#[utoipa::path(
    get,
    path = "/api/attendance/days",
    params(DaysQuery),
    responses(
        (status = 200, description = "Per-day statuses", body = [crate::engine::classifier::DayView]),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_days(auth: AuthUser, pool: web::Data<MySqlPool>, query: web::Query<DaysQuery>) -> actix_web::Result<impl Responder> {
    let DaysQuery { month, year, empid } = query.into_inner();
    let empid = day_view_target(&auth, empid)?;

    let days = attendance_service::day_views(pool.get_ref(), &empid, month, year).await?;
    Ok(HttpResponse::Ok().json(days))
}
