use rust_decimal::Decimal;
use sqlx::MySqlPool;
use tracing::instrument;

use crate::auth::auth::AuthUser;
use crate::auth::capability::{Capability, check_approver};
use crate::clock::Clock;
use crate::engine::loan::{build_schedule, check_eligibility, decide_stage};
use crate::error::{AppError, AppResult};
use crate::model::employee::EmpId;
use crate::model::loan::{EmployeeLoan, Installment, LoanStage, LoanStatus};
use crate::store;

/// Longest repayment schedule accepted.
pub const MAX_TENURE_MONTHS: u32 = 60;

/// File a loan application. Needs three frozen payslips on record.
#[instrument(skip(pool))]
pub async fn apply_loan(pool: &MySqlPool, empid: &EmpId, amount: Decimal, tenure_months: u32) -> AppResult<u64> {
    if amount <= Decimal::ZERO {
        return Err(AppError::validation("loan amount must be positive"));
    }
    if !(1..=MAX_TENURE_MONTHS).contains(&tenure_months) {
        return Err(AppError::validation(format!(
            "tenure must be between 1 and {MAX_TENURE_MONTHS} months"
        )));
    }

    let numeric = empid.require_numeric()?;
    store::employee::require(pool, empid).await?;
    check_eligibility(store::payslip::count_frozen(pool, numeric).await?)?;

    let loan_id = store::loan::insert(pool, empid, amount, tenure_months).await?;
    tracing::info!(loan_id, %amount, tenure_months, "Loan applied");
    Ok(loan_id)
}

/// The manager stage is decided by the applicant's approver; hr and
/// accounts stages need payroll rights.
fn check_stage_rights(approver: &AuthUser, stage: LoanStage, applicant: &crate::model::employee::Employee) -> AppResult<()> {
    match stage {
        LoanStage::Manager => {
            approver.require(Capability::LeaveApprover)?;
            check_approver(approver.role, approver.empid.as_ref(), applicant)
        }
        LoanStage::Hr | LoanStage::Accounts => {
            approver.require(Capability::PayrollAdmin)?;
            if approver.empid.as_ref() == Some(&applicant.empid) {
                return Err(AppError::precondition("applicants cannot decide their own loan"));
            }
            Ok(())
        }
    }
}

#[instrument(skip(pool, clock, approver), fields(approver = %approver.username))]
pub async fn decide_loan_stage(
    pool: &MySqlPool,
    clock: &dyn Clock,
    approver: &AuthUser,
    loan_id: u64,
    stage: LoanStage,
    approve: bool,
) -> AppResult<EmployeeLoan> {
    let mut tx = pool.begin().await?;
    let mut loan = store::loan::lock(&mut *tx, loan_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("loan {loan_id} not found")))?;
    let applicant = store::employee::require(&mut *tx, &loan.empid).await?;
    check_stage_rights(approver, stage, &applicant)?;

    decide_stage(&mut loan, stage, approve, &approver.username, clock.now())?;
    store::loan::save(&mut *tx, &loan).await?;
    tx.commit().await?;

    tracing::info!(loan_id, %stage, approve, status = %loan.status, "Loan stage decided");
    Ok(loan)
}

/// Turn an approved loan into an installment schedule and mark it ACTIVE.
#[instrument(skip(pool, clock, approver), fields(approver = %approver.username))]
pub async fn activate_loan(
    pool: &MySqlPool,
    clock: &dyn Clock,
    approver: &AuthUser,
    loan_id: u64,
) -> AppResult<(EmployeeLoan, Vec<Installment>)> {
    approver.require(Capability::PayrollAdmin)?;

    let mut tx = pool.begin().await?;
    let mut loan = store::loan::lock(&mut *tx, loan_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("loan {loan_id} not found")))?;
    if loan.status != LoanStatus::Approved {
        return Err(AppError::precondition(format!(
            "loan {loan_id} is {} and cannot be activated",
            loan.status
        )));
    }

    let schedule = build_schedule(loan.loan_amount, loan.tenure_months, clock.today())?;
    store::loan::insert_schedule(&mut *tx, loan_id, &loan.empid, &schedule).await?;
    loan.status = LoanStatus::Active;
    store::loan::save(&mut *tx, &loan).await?;
    tx.commit().await?;

    tracing::info!(loan_id, installments = schedule.len(), "Loan activated");
    Ok((loan, schedule))
}
