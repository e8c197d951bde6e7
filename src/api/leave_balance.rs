use actix_web::{HttpResponse, Responder, web};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::PageQuery;
use crate::auth::auth::AuthUser;
use crate::auth::capability::Capability;
use crate::clock::Clock;
use crate::config::Config;
use crate::model::employee::EmpId;
use crate::model::leave_balance::LeaveBalance;
use crate::service::leave::leave_read_filter;
use crate::service::leave_balance::generate_leave_balances;
use crate::store;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GenerateBalances {
    /// Defaults to the current year.
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

#[utoipa::path(
    post,
    path = "/api/leave-balances/generate",
    request_body = GenerateBalances,
    responses(
        (status = 200, description = "Missing rows created", body = crate::service::leave_balance::BalanceRun),
        (status = 400, description = "Year out of range"),
        (status = 403, description = "Missing capability")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn generate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    body: web::Json<GenerateBalances>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::AttendanceAdmin)?;
    let run = generate_leave_balances(pool.get_ref(), clock.get_ref(), body.year).await?;
    Ok(HttpResponse::Ok().json(run))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BalanceQuery {
    /// Defaults to the current year.
    pub year: Option<i32>,
    pub empid: Option<EmpId>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct BalancePage {
    pub year: i32,
    pub data: Vec<LeaveBalance>,
    pub page: u32,
    pub per_page: u32,
}

#[utoipa::path(
    get,
    path = "/api/leave-balances",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Leave balances", body = BalancePage),
        (status = 403, description = "Not allowed to read these rows")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    config: web::Data<Config>,
    query: web::Query<BalanceQuery>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();
    let year = query.year.unwrap_or_else(|| clock.today().year());
    let paging = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve(&config);
    let visibility = leave_read_filter(&auth, query.empid)?;

    let data = store::leave_balance::list(pool.get_ref(), year, &visibility, paging.per_page, paging.offset).await?;
    Ok(HttpResponse::Ok().json(BalancePage {
        year,
        data,
        page: paging.page,
        per_page: paging.per_page,
    }))
}
