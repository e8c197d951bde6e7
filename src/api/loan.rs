use actix_web::{HttpResponse, Responder, web};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::PageQuery;
use crate::api::leave_request::CreatedResponse;
use crate::auth::auth::AuthUser;
use crate::auth::capability::Capability;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::AppError;
use crate::model::employee::EmpId;
use crate::model::loan::{EmployeeLoan, Installment, LoanStage};
use crate::service::loan as loan_service;
use crate::store;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyLoan {
    #[schema(value_type = f64, example = 60000)]
    pub amount: Decimal,
    #[schema(example = 12)]
    pub tenure_months: u32,
}

#[utoipa::path(
    post,
    path = "/api/loans",
    request_body = ApplyLoan,
    responses(
        (status = 201, description = "Loan applied", body = CreatedResponse),
        (status = 400, description = "Bad amount or tenure"),
        (status = 409, description = "Not enough frozen payslips")
    ),
    security(("bearer_auth" = [])),
    tag = "Loans"
)]
pub async fn apply(auth: AuthUser, pool: web::Data<MySqlPool>, body: web::Json<ApplyLoan>) -> actix_web::Result<impl Responder> {
    let empid = auth.require_empid()?;
    let id = loan_service::apply_loan(pool.get_ref(), empid, body.amount, body.tenure_months).await?;
    Ok(HttpResponse::Created().json(CreatedResponse { id }))
}

/// Payroll admins read every loan; everyone else only their own.
fn loan_read_filter(auth: &AuthUser, requested: Option<EmpId>) -> Result<Option<EmpId>, AppError> {
    if auth.can(Capability::PayrollAdmin) {
        return Ok(requested);
    }
    let me = auth.require_empid()?;
    match requested {
        Some(other) if &other != me => Err(AppError::forbidden(format!("cannot read loans of employee {other}"))),
        _ => Ok(Some(me.clone())),
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    pub empid: Option<EmpId>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct LoanPage {
    pub data: Vec<EmployeeLoan>,
    pub page: u32,
    pub per_page: u32,
}

#[utoipa::path(
    get,
    path = "/api/loans",
    params(LoanQuery),
    responses(
        (status = 200, description = "Loans", body = LoanPage),
        (status = 403, description = "Not allowed to read these rows")
    ),
    security(("bearer_auth" = [])),
    tag = "Loans"
)]
pub async fn list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<LoanQuery>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();
    let paging = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve(&config);
    let empid = loan_read_filter(&auth, query.empid)?;

    let data = store::loan::list(pool.get_ref(), empid.as_ref(), paging.per_page, paging.offset).await?;
    Ok(HttpResponse::Ok().json(LoanPage {
        data,
        page: paging.page,
        per_page: paging.per_page,
    }))
}

#[utoipa::path(
    get,
    path = "/api/loans/{id}/installments",
    params(("id" = u64, Path, description = "Loan id")),
    responses(
        (status = 200, description = "Installment schedule", body = crate::model::loan::LoanInstallments),
        (status = 404, description = "Loan not active or not visible")
    ),
    security(("bearer_auth" = [])),
    tag = "Loans"
)]
pub async fn installments(auth: AuthUser, pool: web::Data<MySqlPool>, path: web::Path<u64>) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    let schedule = store::loan::installments(pool.get_ref(), id)
        .await?
        .filter(|s| loan_read_filter(&auth, Some(s.empid.clone())).is_ok())
        .ok_or_else(|| AppError::not_found(format!("no schedule for loan {id}")))?;

    Ok(HttpResponse::Ok().json(schedule))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StageDecision {
    pub approve: bool,
}

#[utoipa::path(
    put,
    path = "/api/loans/{id}/stages/{stage}",
    params(
        ("id" = u64, Path, description = "Loan id"),
        ("stage" = LoanStage, Path, description = "manager, hr or accounts")
    ),
    request_body = StageDecision,
    responses(
        (status = 200, description = "Stage decided", body = EmployeeLoan),
        (status = 403, description = "Not allowed to decide this stage"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Stage out of order or already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Loans"
)]
pub async fn decide_stage(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    path: web::Path<(u64, LoanStage)>,
    body: web::Json<StageDecision>,
) -> actix_web::Result<impl Responder> {
    let (id, stage) = path.into_inner();
    let loan = loan_service::decide_loan_stage(pool.get_ref(), clock.get_ref(), &auth, id, stage, body.approve).await?;
    Ok(HttpResponse::Ok().json(loan))
}

#[derive(Serialize, ToSchema)]
pub struct ActivatedLoan {
    pub loan: EmployeeLoan,
    pub installments: Vec<Installment>,
}

#[utoipa::path(
    post,
    path = "/api/loans/{id}/activate",
    params(("id" = u64, Path, description = "Loan id")),
    responses(
        (status = 200, description = "Schedule created", body = ActivatedLoan),
        (status = 403, description = "Missing capability"),
        (status = 409, description = "Loan is not approved")
    ),
    security(("bearer_auth" = [])),
    tag = "Loans"
)]
pub async fn activate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let (loan, installments) = loan_service::activate_loan(pool.get_ref(), clock.get_ref(), &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ActivatedLoan { loan, installments }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::capability::RoleCapabilities;
    use crate::model::role::Role;

    fn user(role: Role, empid: Option<&str>) -> AuthUser {
        AuthUser {
            user_id: 3,
            username: "u".into(),
            role,
            empid: empid.map(|e| EmpId::parse(e).unwrap()),
            capabilities: RoleCapabilities::default().for_role(role),
        }
    }

    #[test]
    fn managers_only_see_their_own_loans() {
        let manager = user(Role::Manager, Some("2000"));
        assert_eq!(loan_read_filter(&manager, None).unwrap(), Some(EmpId::parse("2000").unwrap()));
        assert!(loan_read_filter(&manager, Some(EmpId::parse("1001").unwrap())).is_err());
    }

    #[test]
    fn payroll_admins_see_everyone() {
        let admin = user(Role::Admin, None);
        assert_eq!(loan_read_filter(&admin, None).unwrap(), None);
    }
}
