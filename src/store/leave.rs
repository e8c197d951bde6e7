use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::{Executor, MySql};

use crate::engine::leave::LeaveApplication;
use crate::error::AppResult;
use crate::model::employee::EmpId;
use crate::store::employee::Visibility;
use crate::model::leave_request::{ApprovalStatus, LeaveRequest};

const COLUMNS: &str = r#"
    id, empid, from_date, to_date, leave_type, status, duration,
    half_from, half_to, reason, decided_by, created_at
"#;

pub async fn insert<'e, E>(
    exec: E,
    empid: &EmpId,
    app: &LeaveApplication,
    duration: Decimal,
    reason: Option<&str>,
) -> AppResult<u64>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (empid, from_date, to_date, leave_type, status, duration, half_from, half_to, reason)
        VALUES (?, ?, ?, ?, 'pending', ?, ?, ?, ?)
        "#,
    )
    .bind(empid)
    .bind(app.from)
    .bind(app.to)
    .bind(app.leave_type)
    .bind(duration)
    .bind(app.half_from)
    .bind(app.half_to)
    .bind(reason)
    .execute(exec)
    .await?;

    Ok(result.last_insert_id())
}

pub async fn find<'e, E>(exec: E, id: u64) -> AppResult<Option<LeaveRequest>>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {COLUMNS} FROM leave_requests WHERE id = ?");
    Ok(sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await?)
}

pub async fn lock<'e, E>(exec: E, id: u64) -> AppResult<Option<LeaveRequest>>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE");
    Ok(sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await?)
}

/// Pending or approved leaves of `empid` overlapping `[from, to]`.
pub async fn live_overlapping<'e, E>(exec: E, empid: &EmpId, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<LeaveRequest>>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!(
        r#"
        SELECT {COLUMNS} FROM leave_requests
        WHERE empid = ? AND status <> 'rejected' AND from_date <= ? AND to_date >= ?
        "#
    );
    Ok(sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(empid)
        .bind(to)
        .bind(from)
        .fetch_all(exec)
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
    sqlx::query("UPDATE leave_requests SET status = ?, decided_by = ?, decided_at = ? WHERE id = ?")
        .bind(status)
        .bind(decided_by)
        .bind(at)
        .bind(id)
        .execute(exec)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct LeaveFilter {
    pub visibility: Visibility,
    pub status: Option<ApprovalStatus>,
}

impl LeaveFilter {
    fn where_sql(&self) -> String {
        let mut sql = String::from(" WHERE 1=1");
        sql.push_str(&self.visibility.where_sql());
        if self.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql
    }
}

pub async fn count<'e, E>(exec: E, filter: &LeaveFilter) -> AppResult<i64>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT COUNT(*) FROM leave_requests{}", filter.where_sql());
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for empid in filter.visibility.binds() {
        query = query.bind(empid);
    }
    if let Some(status) = filter.status {
        query = query.bind(status);
    }
    Ok(query.fetch_one(exec).await?)
}

pub async fn list<'e, E>(exec: E, filter: &LeaveFilter, limit: u32, offset: u64) -> AppResult<Vec<LeaveRequest>>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!(
        "SELECT {COLUMNS} FROM leave_requests{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        filter.where_sql()
    );
    let mut query = sqlx::query_as::<_, LeaveRequest>(&sql);
    for empid in filter.visibility.binds() {
        query = query.bind(empid);
    }
    if let Some(status) = filter.status {
        query = query.bind(status);
    }
    Ok(query.bind(limit).bind(offset).fetch_all(exec).await?)
}
