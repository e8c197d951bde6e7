use chrono::NaiveDate;
use sqlx::{Executor, MySql};

use crate::error::AppResult;
use crate::model::calendar::{Holiday, WeekOffEntry, WeekOffScope};
use crate::model::employee::EmpId;
use crate::model::leave_request::LeaveRequest;

pub async fn week_offs_between<'e, E>(exec: E, first: NaiveDate, last: NaiveDate) -> AppResult<Vec<WeekOffEntry>>
where
    E: Executor<'e, Database = MySql>,
{
    let rows = sqlx::query_as::<_, (String, NaiveDate)>(
        "SELECT empid, week_off_date FROM week_offs WHERE week_off_date BETWEEN ? AND ?",
    )
    .bind(first)
    .bind(last)
    .fetch_all(exec)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(raw, date)| match WeekOffScope::from_column(&raw) {
            Some(scope) => Some(WeekOffEntry { scope, date }),
            None => {
                tracing::warn!(empid = %raw, %date, "Ignoring week-off with malformed empid");
                None
            }
        })
        .collect())
}

pub async fn holidays_between<'e, E>(exec: E, first: NaiveDate, last: NaiveDate) -> AppResult<Vec<Holiday>>
where
    E: Executor<'e, Database = MySql>,
{
    Ok(sqlx::query_as::<_, Holiday>(
        r#"
        SELECT id, holiday_date, name, holiday_permissions
        FROM holidays
        WHERE holiday_date BETWEEN ? AND ?
        "#,
    )
    .bind(first)
    .bind(last)
    .fetch_all(exec)
    .await?)
}

/// Approved leaves overlapping `[first, last]`.
pub async fn approved_leaves_between<'e, E>(
    exec: E,
    first: NaiveDate,
    last: NaiveDate,
    only: Option<&EmpId>,
) -> AppResult<Vec<LeaveRequest>>
where
    E: Executor<'e, Database = MySql>,
{
    let mut sql = String::from(
        r#"
        SELECT id, empid, from_date, to_date, leave_type, status, duration,
               half_from, half_to, reason, decided_by, created_at
        FROM leave_requests
        WHERE status = 'approved' AND from_date <= ? AND to_date >= ?
        "#,
    );
    if only.is_some() {
        sql.push_str(" AND empid = ?");
    }

    let mut query = sqlx::query_as::<_, LeaveRequest>(&sql).bind(last).bind(first);
    if let Some(empid) = only {
        query = query.bind(empid);
    }
    Ok(query.fetch_all(exec).await?)
}
