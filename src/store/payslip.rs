use chrono::NaiveDateTime;
use sqlx::{Executor, MySql};

use crate::error::AppResult;
use crate::model::employee::BankDetails;
use crate::model::payslip::Payslip;

const COLUMNS: &str = r#"
    empid, month, year, name, doj, branch_id, department_id, total_days, payable_days,
    gross_salary, bank_name, account_no, ifsc, pan, pf_no, esi_no, earnings, deductions,
    earned_gross, net_salary, freaze_status, generated_at, updated_date, updated_by
"#;

/// Freeze flag of an existing payslip, locked for the payroll transaction.
pub async fn lock_freeze_flag<'e, E>(exec: E, empid: i64, month: u32, year: i32) -> AppResult<Option<bool>>
where
    E: Executor<'e, Database = MySql>,
{
    Ok(sqlx::query_scalar::<_, bool>(
        "SELECT freaze_status FROM payslips WHERE empid = ? AND month = ? AND year = ? FOR UPDATE",
    )
    .bind(empid)
    .bind(month)
    .bind(year)
    .fetch_optional(exec)
    .await?)
}

/// Insert or replace the computed fields of (empid, month, year). Freeze
/// state and audit fields of an existing row are left alone.
pub async fn upsert<'e, E>(exec: E, p: &Payslip) -> AppResult<()>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query(
        r#"
        INSERT INTO payslips
            (empid, month, year, name, doj, branch_id, department_id, total_days, payable_days,
             gross_salary, bank_name, account_no, ifsc, pan, pf_no, esi_no, earnings, deductions,
             earned_gross, net_salary, freaze_status, generated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            name = VALUES(name), doj = VALUES(doj), branch_id = VALUES(branch_id),
            department_id = VALUES(department_id), total_days = VALUES(total_days),
            payable_days = VALUES(payable_days), gross_salary = VALUES(gross_salary),
            bank_name = VALUES(bank_name), account_no = VALUES(account_no), ifsc = VALUES(ifsc),
            pan = VALUES(pan), pf_no = VALUES(pf_no), esi_no = VALUES(esi_no),
            earnings = VALUES(earnings), deductions = VALUES(deductions),
            earned_gross = VALUES(earned_gross), net_salary = VALUES(net_salary),
            generated_at = VALUES(generated_at)
        "#,
    )
    .bind(p.empid)
    .bind(p.month)
    .bind(p.year)
    .bind(&p.name)
    .bind(p.doj)
    .bind(p.branch_id)
    .bind(p.department_id)
    .bind(p.total_days)
    .bind(p.payable_days)
    .bind(p.gross_salary)
    .bind(&p.bank_name)
    .bind(&p.account_no)
    .bind(&p.ifsc)
    .bind(&p.pan)
    .bind(&p.pf_no)
    .bind(&p.esi_no)
    .bind(&p.earnings)
    .bind(&p.deductions)
    .bind(p.earned_gross)
    .bind(p.net_salary)
    .bind(p.freaze_status)
    .bind(p.generated_at)
    .execute(exec)
    .await?;
    Ok(())
}

/// Freeze counts for a cohort: (rows, frozen rows).
pub async fn freeze_counts<'e, E>(exec: E, month: u32, year: i32) -> AppResult<(i64, i64)>
where
    E: Executor<'e, Database = MySql>,
{
    let (total, frozen): (i64, Option<rust_decimal::Decimal>) = sqlx::query_as(
        r#"
        SELECT COUNT(*), SUM(freaze_status)
        FROM payslips
        WHERE month = ? AND year = ?
        FOR UPDATE
        "#,
    )
    .bind(month)
    .bind(year)
    .fetch_one(exec)
    .await?;

    let frozen = frozen
        .and_then(|d| i64::try_from(d).ok())
        .unwrap_or_default();
    Ok((total, frozen))
}

pub async fn set_freeze<'e, E>(
    exec: E,
    month: u32,
    year: i32,
    frozen: bool,
    by: &str,
    at: NaiveDateTime,
) -> AppResult<u64>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query(
        r#"
        UPDATE payslips
        SET freaze_status = ?, updated_date = ?, updated_by = ?
        WHERE month = ? AND year = ?
        "#,
    )
    .bind(frozen)
    .bind(at)
    .bind(by)
    .bind(month)
    .bind(year)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

pub async fn find<'e, E>(exec: E, empid: i64, month: u32, year: i32) -> AppResult<Option<Payslip>>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {COLUMNS} FROM payslips WHERE empid = ? AND month = ? AND year = ?");
    Ok(sqlx::query_as::<_, Payslip>(&sql)
        .bind(empid)
        .bind(month)
        .bind(year)
        .fetch_optional(exec)
        .await?)
}

#[derive(Debug, Clone, Default)]
pub struct PayslipFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub empid: Option<i64>,
    pub frozen_only: bool,
}

impl PayslipFilter {
    fn where_sql(&self) -> String {
        let mut sql = String::from(" WHERE 1=1");
        if self.month.is_some() {
            sql.push_str(" AND month = ?");
        }
        if self.year.is_some() {
            sql.push_str(" AND year = ?");
        }
        if self.empid.is_some() {
            sql.push_str(" AND empid = ?");
        }
        if self.frozen_only {
            sql.push_str(" AND freaze_status = TRUE");
        }
        sql
    }
}

macro_rules! bind_filter {
    ($query:expr, $filter:expr) => {{
        let mut q = $query;
        if let Some(month) = $filter.month {
            q = q.bind(month);
        }
        if let Some(year) = $filter.year {
            q = q.bind(year);
        }
        if let Some(empid) = $filter.empid {
            q = q.bind(empid);
        }
        q
    }};
}

pub async fn count<'e, E>(exec: E, filter: &PayslipFilter) -> AppResult<i64>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT COUNT(*) FROM payslips{}", filter.where_sql());
    let query = bind_filter!(sqlx::query_scalar::<_, i64>(&sql), filter);
    Ok(query.fetch_one(exec).await?)
}

pub async fn list<'e, E>(exec: E, filter: &PayslipFilter, limit: u32, offset: u64) -> AppResult<Vec<Payslip>>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!(
        "SELECT {COLUMNS} FROM payslips{} ORDER BY year DESC, month DESC, empid LIMIT ? OFFSET ?",
        filter.where_sql()
    );
    let query = bind_filter!(sqlx::query_as::<_, Payslip>(&sql), filter);
    Ok(query.bind(limit).bind(offset).fetch_all(exec).await?)
}

/// Copy bank identifiers onto every payslip of `empid`.
pub async fn backfill_bank<'e, E>(exec: E, empid: i64, bank: &BankDetails, by: &str, at: NaiveDateTime) -> AppResult<u64>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query(
        r#"
        UPDATE payslips
        SET bank_name = ?, account_no = ?, ifsc = ?, pan = ?, pf_no = ?, esi_no = ?,
            updated_date = ?, updated_by = ?
        WHERE empid = ?
        "#,
    )
    .bind(&bank.bank_name)
    .bind(&bank.account_no)
    .bind(&bank.ifsc)
    .bind(&bank.pan)
    .bind(&bank.pf_no)
    .bind(&bank.esi_no)
    .bind(at)
    .bind(by)
    .bind(empid)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

pub async fn count_frozen<'e, E>(exec: E, empid: i64) -> AppResult<i64>
where
    E: Executor<'e, Database = MySql>,
{
    Ok(
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payslips WHERE empid = ? AND freaze_status = TRUE")
            .bind(empid)
            .fetch_one(exec)
            .await?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_only_adds_given_clauses() {
        let filter = PayslipFilter {
            month: Some(12),
            year: Some(2025),
            empid: None,
            frozen_only: true,
        };
        let sql = filter.where_sql();
        assert!(sql.contains("month = ?"));
        assert!(sql.contains("year = ?"));
        assert!(!sql.contains("empid = ?"));
        assert!(sql.ends_with("freaze_status = TRUE"));
    }
}
