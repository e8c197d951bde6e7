use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{Executor, MySql};

use crate::error::AppResult;
use crate::model::employee::EmpId;
use crate::store::employee::Visibility;
use crate::model::leave_request::ApprovalStatus;
use crate::model::request::{AttendanceRequest, RequestType};

const COLUMNS: &str = r#"
    id, empid, request_type, request_date, in_time, out_time,
    reason, status, decided_by, created_at
"#;

pub struct NewRequest<'a> {
    pub empid: &'a EmpId,
    pub request_type: RequestType,
    pub request_date: NaiveDate,
    pub in_time: Option<NaiveTime>,
    pub out_time: Option<NaiveTime>,
    pub reason: Option<&'a str>,
}

pub async fn insert<'e, E>(exec: E, req: NewRequest<'_>) -> AppResult<u64>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_requests
            (empid, request_type, request_date, in_time, out_time, reason, status)
        VALUES (?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(req.empid)
    .bind(req.request_type)
    .bind(req.request_date)
    .bind(req.in_time)
    .bind(req.out_time)
    .bind(req.reason)
    .execute(exec)
    .await?;

    Ok(result.last_insert_id())
}

/// Whether a pending or approved request already exists for the date.
pub async fn live_on_date<'e, E>(exec: E, empid: &EmpId, date: NaiveDate) -> AppResult<bool>
where
    E: Executor<'e, Database = MySql>,
{
    Ok(sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM attendance_requests
            WHERE empid = ? AND request_date = ? AND status <> 'rejected'
        )
        "#,
    )
    .bind(empid)
    .bind(date)
    .fetch_one(exec)
    .await?)
}

pub async fn lock<'e, E>(exec: E, id: u64) -> AppResult<Option<AttendanceRequest>>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {COLUMNS} FROM attendance_requests WHERE id = ? FOR UPDATE");
    Ok(sqlx::query_as::<_, AttendanceRequest>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await?)
}

pub async fn set_status<'e, E>(
    exec: E,
    id: u64,
    status: ApprovalStatus,
    decided_by: Option<&EmpId>,
    at: NaiveDateTime,
) -> AppResult<()>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query("UPDATE attendance_requests SET status = ?, decided_by = ?, decided_at = ? WHERE id = ?")
        .bind(status)
        .bind(decided_by)
        .bind(at)
        .bind(id)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn list<'e, E>(
    exec: E,
    visibility: &Visibility,
    status: Option<ApprovalStatus>,
    limit: u32,
    offset: u64,
) -> AppResult<Vec<AttendanceRequest>>
where
    E: Executor<'e, Database = MySql>,
{
    let mut sql = format!("SELECT {COLUMNS} FROM attendance_requests WHERE 1=1");
    sql.push_str(&visibility.where_sql());
    if status.is_some() {
        sql.push_str(" AND status = ?");
    }
    sql.push_str(" ORDER BY request_date DESC, id DESC LIMIT ? OFFSET ?");

    let mut query = sqlx::query_as::<_, AttendanceRequest>(&sql);
    for empid in visibility.binds() {
        query = query.bind(empid);
    }
    if let Some(status) = status {
        query = query.bind(status);
    }
    Ok(query.bind(limit).bind(offset).fetch_all(exec).await?)
}
