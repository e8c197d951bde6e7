use sqlx::{Executor, MySql};

use crate::error::{AppError, AppResult};
use crate::model::employee::EmpId;
use crate::store::employee::Visibility;
use crate::model::leave_balance::LeaveBalance;

const COLUMNS: &str = r#"
    empid, year, total_casual, used_casual, balance_casual, total_sick, used_sick,
    balance_sick, total_comp_off, used_comp_off, balance_comp_off
"#;

/// Insert unless (empid, year) already exists. True when a row was created.
pub async fn insert_if_absent<'e, E>(exec: E, b: &LeaveBalance) -> AppResult<bool>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query(
        r#"
        INSERT IGNORE INTO leave_balances
            (empid, year, total_casual, used_casual, balance_casual, total_sick, used_sick,
             balance_sick, total_comp_off, used_comp_off, balance_comp_off)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&b.empid)
    .bind(b.year)
    .bind(b.total_casual)
    .bind(b.used_casual)
    .bind(b.balance_casual)
    .bind(b.total_sick)
    .bind(b.used_sick)
    .bind(b.balance_sick)
    .bind(b.total_comp_off)
    .bind(b.used_comp_off)
    .bind(b.balance_comp_off)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn lock<'e, E>(exec: E, empid: &EmpId, year: i32) -> AppResult<Option<LeaveBalance>>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {COLUMNS} FROM leave_balances WHERE empid = ? AND year = ? FOR UPDATE");
    Ok(sqlx::query_as::<_, LeaveBalance>(&sql)
        .bind(empid)
        .bind(year)
        .fetch_optional(exec)
        .await?)
}

/// Write the whole row, creating it when missing.
pub async fn save<'e, E>(exec: E, b: &LeaveBalance) -> AppResult<()>
where
    E: Executor<'e, Database = MySql>,
{
    if !b.is_consistent() {
        return Err(AppError::internal(format!(
            "leave balance of {} for {} does not add up",
            b.empid, b.year
        )));
    }
    sqlx::query(
        r#"
        INSERT INTO leave_balances
            (empid, year, total_casual, used_casual, balance_casual, total_sick, used_sick,
             balance_sick, total_comp_off, used_comp_off, balance_comp_off)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            total_casual = VALUES(total_casual), used_casual = VALUES(used_casual),
            balance_casual = VALUES(balance_casual), total_sick = VALUES(total_sick),
            used_sick = VALUES(used_sick), balance_sick = VALUES(balance_sick),
            total_comp_off = VALUES(total_comp_off), used_comp_off = VALUES(used_comp_off),
            balance_comp_off = VALUES(balance_comp_off)
        "#,
    )
    .bind(&b.empid)
    .bind(b.year)
    .bind(b.total_casual)
    .bind(b.used_casual)
    .bind(b.balance_casual)
    .bind(b.total_sick)
    .bind(b.used_sick)
    .bind(b.balance_sick)
    .bind(b.total_comp_off)
    .bind(b.used_comp_off)
    .bind(b.balance_comp_off)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn list<'e, E>(
    exec: E,
    year: i32,
    visibility: &Visibility,
    limit: u32,
    offset: u64,
) -> AppResult<Vec<LeaveBalance>>
where
    E: Executor<'e, Database = MySql>,
{
    let mut sql = format!("SELECT {COLUMNS} FROM leave_balances WHERE year = ?");
    sql.push_str(&visibility.where_sql());
    sql.push_str(" ORDER BY empid LIMIT ? OFFSET ?");

    let mut query = sqlx::query_as::<_, LeaveBalance>(&sql).bind(year);
    for empid in visibility.binds() {
        query = query.bind(empid);
    }
    Ok(query.bind(limit).bind(offset).fetch_all(exec).await?)
}
