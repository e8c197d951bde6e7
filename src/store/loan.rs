use rust_decimal::Decimal;
use sqlx::{Executor, MySql, types::Json};

use crate::error::AppResult;
use crate::model::employee::EmpId;
use crate::model::loan::{ApprovalBag, EmployeeLoan, Installment, LoanInstallments, LoanStatus};

const LOAN_COLUMNS: &str = "loan_id, empid, loan_amount, tenure_months, manager, hr, accounts, status";

pub async fn insert<'e, E>(exec: E, empid: &EmpId, amount: Decimal, tenure_months: u32) -> AppResult<u64>
where
    E: Executor<'e, Database = MySql>,
{
    let pending = Json(ApprovalBag::default());
    let result = sqlx::query(
        r#"
        INSERT INTO employee_loans (empid, loan_amount, tenure_months, manager, hr, accounts, status)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(empid)
    .bind(amount)
    .bind(tenure_months)
    .bind(&pending)
    .bind(&pending)
    .bind(&pending)
    .bind(LoanStatus::Applied)
    .execute(exec)
    .await?;

    Ok(result.last_insert_id())
}

pub async fn lock<'e, E>(exec: E, loan_id: u64) -> AppResult<Option<EmployeeLoan>>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {LOAN_COLUMNS} FROM employee_loans WHERE loan_id = ? FOR UPDATE");
    Ok(sqlx::query_as::<_, EmployeeLoan>(&sql)
        .bind(loan_id)
        .fetch_optional(exec)
        .await?)
}

/// Write back approval bags and status.
pub async fn save<'e, E>(exec: E, loan: &EmployeeLoan) -> AppResult<()>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query("UPDATE employee_loans SET manager = ?, hr = ?, accounts = ?, status = ? WHERE loan_id = ?")
        .bind(&loan.manager)
        .bind(&loan.hr)
        .bind(&loan.accounts)
        .bind(loan.status)
        .bind(loan.loan_id)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn list<'e, E>(exec: E, empid: Option<&EmpId>, limit: u32, offset: u64) -> AppResult<Vec<EmployeeLoan>>
where
    E: Executor<'e, Database = MySql>,
{
    let mut sql = format!("SELECT {LOAN_COLUMNS} FROM employee_loans");
    if empid.is_some() {
        sql.push_str(" WHERE empid = ?");
    }
    sql.push_str(" ORDER BY loan_id DESC LIMIT ? OFFSET ?");

    let mut query = sqlx::query_as::<_, EmployeeLoan>(&sql);
    if let Some(empid) = empid {
        query = query.bind(empid);
    }
    Ok(query.bind(limit).bind(offset).fetch_all(exec).await?)
}

pub async fn mark_cleared<'e, E>(exec: E, loan_id: u64) -> AppResult<()>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query("UPDATE employee_loans SET status = ? WHERE loan_id = ? AND status = ?")
        .bind(LoanStatus::Cleared)
        .bind(loan_id)
        .bind(LoanStatus::Active)
        .execute(exec)
        .await?;
    Ok(())
}

/* =========================
Installments
========================= */

pub async fn insert_schedule<'e, E>(exec: E, loan_id: u64, empid: &EmpId, schedule: &[Installment]) -> AppResult<()>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query("INSERT INTO loan_installments (loan_id, empid, installments) VALUES (?, ?, ?)")
        .bind(loan_id)
        .bind(empid)
        .bind(Json(schedule))
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn installments<'e, E>(exec: E, loan_id: u64) -> AppResult<Option<LoanInstallments>>
where
    E: Executor<'e, Database = MySql>,
{
    Ok(sqlx::query_as::<_, LoanInstallments>(
        "SELECT loan_id, empid, installments FROM loan_installments WHERE loan_id = ?",
    )
    .bind(loan_id)
    .fetch_optional(exec)
    .await?)
}

/// Installment lists of the employee's active loans, locked for the
/// payroll transaction. Cleared loans are included so a re-run still sees
/// what it settled the first time.
pub async fn lock_active_installments<'e, E>(exec: E, empid: &EmpId) -> AppResult<Vec<LoanInstallments>>
where
    E: Executor<'e, Database = MySql>,
{
    Ok(sqlx::query_as::<_, LoanInstallments>(
        r#"
        SELECT li.loan_id, li.empid, li.installments
        FROM loan_installments li
        JOIN employee_loans l ON l.loan_id = li.loan_id
        WHERE li.empid = ? AND l.status IN ('ACTIVE', 'CLEARED')
        ORDER BY li.loan_id
        FOR UPDATE
        "#,
    )
    .bind(empid)
    .fetch_all(exec)
    .await?)
}

pub async fn save_installments<'e, E>(exec: E, record: &LoanInstallments) -> AppResult<()>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query("UPDATE loan_installments SET installments = ? WHERE loan_id = ?")
        .bind(&record.installments)
        .bind(record.loan_id)
        .execute(exec)
        .await?;
    Ok(())
}
