use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::PageQuery;
use crate::api::leave_request::CreatedResponse;
use crate::auth::auth::AuthUser;
use crate::clock::Clock;
use crate::config::Config;
use crate::model::employee::EmpId;
use crate::model::leave_request::ApprovalStatus;
use crate::model::request::{AttendanceRequest, RequestType};
use crate::service::leave::leave_read_filter;
use crate::service::notify::Notifier;
use crate::service::request::{self as request_service, Submission};
use crate::store;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitRequest {
    pub request_type: RequestType,
    #[schema(value_type = String, format = "date", example = "2025-12-06")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, example = "09:30:00")]
    pub in_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "18:30:00")]
    pub out_time: Option<NaiveTime>,
    pub reason: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = SubmitRequest,
    responses(
        (status = 201, description = "Request submitted", body = CreatedResponse),
        (status = 400, description = "Missing times, duplicate date or not a week-off/holiday"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn submit(auth: AuthUser, pool: web::Data<MySqlPool>, body: web::Json<SubmitRequest>) -> actix_web::Result<impl Responder> {
    let empid = auth.require_empid()?;
    let body = body.into_inner();
    let submission = Submission {
        request_type: body.request_type,
        date: body.date,
        in_time: body.in_time,
        out_time: body.out_time,
        reason: body.reason,
    };

    let id = request_service::submit_request(pool.get_ref(), empid, submission).await?;
    Ok(HttpResponse::Created().json(CreatedResponse { id }))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RequestQuery {
    pub empid: Option<EmpId>,
    pub status: Option<ApprovalStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct RequestPage {
    pub data: Vec<AttendanceRequest>,
    pub page: u32,
    pub per_page: u32,
}

#[utoipa::path(
    get,
    path = "/api/requests",
    params(RequestQuery),
    responses(
        (status = 200, description = "Attendance requests", body = RequestPage),
        (status = 403, description = "Not allowed to read these rows")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<RequestQuery>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();
    let paging = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve(&config);
    // Same visibility as leaves.
    let visibility = leave_read_filter(&auth, query.empid)?;

    let data = store::request::list(pool.get_ref(), &visibility, query.status, paging.per_page, paging.offset).await?;
    Ok(HttpResponse::Ok().json(RequestPage {
        data,
        page: paging.page,
        per_page: paging.per_page,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct Decision {
    pub approve: bool,
}

#[utoipa::path(
    put,
    path = "/api/requests/{id}/decision",
    params(("id" = u64, Path, description = "Request id")),
    request_body = Decision,
    responses(
        (status = 200, description = "Request decided", body = AttendanceRequest),
        (status = 403, description = "Not this applicant's approver"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already decided, or own request")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn decide(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    notifier: web::Data<dyn Notifier>,
    path: web::Path<u64>,
    body: web::Json<Decision>,
) -> actix_web::Result<impl Responder> {
    let request = request_service::decide_request(
        pool.get_ref(),
        clock.get_ref(),
        notifier.into_inner(),
        &auth,
        path.into_inner(),
        body.approve,
    )
    .await?;
    Ok(HttpResponse::Ok().json(request))
}
