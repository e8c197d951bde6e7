use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::attendance::CancelResponse;
use crate::api::{CycleRef, PageQuery};
use crate::auth::auth::AuthUser;
use crate::auth::capability::Capability;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::AppError;
use crate::model::employee::{BankDetails, EmpId};
use crate::model::payslip::Payslip;
use crate::model::salary::PayrollGroup;
use crate::service::notify::Notifier;
use crate::service::payroll as payroll_service;
use crate::store::{self, employee::Cohort, payslip::PayslipFilter};
use crate::utils::run_flags::{self, RunKey, RunKind};

#[derive(Debug, Deserialize, ToSchema)]
pub struct GeneratePayroll {
    #[schema(example = 12)]
    pub month: u32,
    #[schema(example = 2025)]
    pub year: i32,
    /// The most specific of these picks the cohort; none means everyone.
    pub empid: Option<EmpId>,
    pub department_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub company_id: Option<i64>,
}

#[utoipa::path(
    post,
    path = "/api/payroll/generate",
    request_body = GeneratePayroll,
    responses(
        (status = 200, description = "Run finished", body = crate::service::RunReport),
        (status = 400, description = "Bad cycle or empty cohort"),
        (status = 403, description = "Missing capability"),
        (status = 409, description = "Another run holds the lock, or nothing could be generated")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn generate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    body: web::Json<GeneratePayroll>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::PayrollAdmin)?;
    let body = body.into_inner();
    let cohort = Cohort::most_specific(body.empid, body.department_id, body.branch_id, body.company_id);

    let report = payroll_service::generate_payslips(pool.get_ref(), clock.get_ref(), body.month, body.year, cohort).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    post,
    path = "/api/payroll/generate/cancel",
    request_body = CycleRef,
    responses(
        (status = 200, description = "Cancel flag set", body = CancelResponse),
        (status = 403, description = "Missing capability")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn cancel_generate(auth: AuthUser, body: web::Json<CycleRef>) -> actix_web::Result<impl Responder> {
    auth.require(Capability::PayrollAdmin)?;
    let CycleRef { month, year } = body.into_inner();

    let cancelled = run_flags::cancel(RunKey::new(RunKind::Payroll, month, year)).await;
    tracing::info!(month, year, cancelled, by = %auth.username, "Payroll run cancel requested");
    Ok(HttpResponse::Ok().json(CancelResponse {
        kind: RunKind::Payroll,
        month,
        year,
        cancelled,
    }))
}

#[utoipa::path(
    put,
    path = "/api/payroll/freeze",
    request_body = CycleRef,
    responses(
        (status = 200, description = "Freeze flag flipped", body = crate::service::payroll::FreezeOutcome),
        (status = 403, description = "Missing capability"),
        (status = 409, description = "No payslips for the cycle, or a run holds the lock")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn toggle_freeze(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    notifier: web::Data<dyn Notifier>,
    body: web::Json<CycleRef>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::AttendanceAdmin)?;
    let CycleRef { month, year } = body.into_inner();

    let outcome = payroll_service::toggle_freeze(
        pool.get_ref(),
        clock.get_ref(),
        notifier.into_inner(),
        month,
        year,
        &auth.username,
    )
    .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PayslipQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub empid: Option<EmpId>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedPayslipResponse {
    pub data: Vec<Payslip>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/api/payroll/payslips",
    params(PayslipQuery),
    responses(
        (status = 200, description = "Payslips visible to the caller", body = PaginatedPayslipResponse),
        (status = 403, description = "Not allowed to read these rows")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payslips(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<PayslipQuery>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();
    let scope = auth.read_scope()?;
    let paging = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve(&config);

    let empid = scope
        .narrow(query.empid)?
        .map(|e| e.require_numeric())
        .transpose()?;
    let filter = PayslipFilter {
        month: query.month,
        year: query.year,
        empid,
        frozen_only: scope.frozen_only(),
    };

    let total = store::payslip::count(pool.get_ref(), &filter).await?;
    let data = store::payslip::list(pool.get_ref(), &filter, paging.per_page, paging.offset).await?;

    Ok(HttpResponse::Ok().json(PaginatedPayslipResponse {
        data,
        page: paging.page,
        per_page: paging.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/payroll/payslips/{empid}/{year}/{month}",
    params(
        ("empid" = String, Path, description = "Employee id"),
        ("year" = i32, Path, description = "Cycle year"),
        ("month" = u32, Path, description = "Cycle month")
    ),
    responses(
        (status = 200, description = "Payslip", body = Payslip),
        (status = 404, description = "No payslip the caller may see")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payslip(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(String, i32, u32)>,
) -> actix_web::Result<impl Responder> {
    let (raw, year, month) = path.into_inner();
    let empid = EmpId::parse(&raw)?;
    let scope = auth.read_scope()?;

    let payslip = store::payslip::find(pool.get_ref(), empid.require_numeric()?, month, year)
        .await?
        .filter(|p| scope.allows(&empid, p.freaze_status))
        .ok_or_else(|| AppError::not_found(format!("no payslip for {empid} in {month:02}/{year}")))?;

    Ok(HttpResponse::Ok().json(payslip))
}

#[derive(Serialize, ToSchema)]
pub struct BackfillResponse {
    pub affected: u64,
}

#[utoipa::path(
    put,
    path = "/api/payroll/bank/{empid}",
    params(("empid" = String, Path, description = "Employee id")),
    request_body = BankDetails,
    responses(
        (status = 200, description = "Bank details written to stored payslips", body = BackfillResponse),
        (status = 403, description = "Missing capability"),
        (status = 404, description = "Employee has no payslips")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn backfill_bank(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    path: web::Path<String>,
    body: web::Json<BankDetails>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::PayrollAdmin)?;
    let empid = EmpId::parse(&path.into_inner())?;

    let affected = payroll_service::backfill_bank(pool.get_ref(), clock.get_ref(), &empid, &body, &auth.username).await?;
    Ok(HttpResponse::Ok().json(BackfillResponse { affected }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GroupReq {
    /// `null` removes the tag.
    pub group: Option<PayrollGroup>,
}

#[utoipa::path(
    put,
    path = "/api/payroll/groups/{empid}",
    params(("empid" = String, Path, description = "Employee id")),
    request_body = GroupReq,
    responses(
        (status = 204, description = "Group updated"),
        (status = 400, description = "Unknown employee"),
        (status = 403, description = "Missing capability")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn set_group(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    body: web::Json<GroupReq>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::PayrollAdmin)?;
    let empid = EmpId::parse(&path.into_inner())?;

    payroll_service::set_group(pool.get_ref(), &empid, body.into_inner().group).await?;
    Ok(HttpResponse::NoContent().finish())
}
