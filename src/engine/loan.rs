//! Loan recovery through payroll, plus the loan approval/schedule rules.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::engine::rounding::round0;
use crate::error::{AppError, AppResult};
use crate::model::loan::{
    ApprovalBag, EmployeeLoan, Installment, InstallmentStatus, LoanInstallments, LoanStage, LoanStatus,
    StageStatus,
};

/// Frozen payslips an employee needs before applying for a loan.
pub const MIN_FROZEN_PAYSLIPS: i64 = 3;

/// What one payroll run did to an employee's installments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanRecovery {
    pub net_salary: Decimal,
    /// Installments settled by this run.
    pub deducted_now: Decimal,
    /// Installments for this month already settled by an earlier run.
    pub recovered_earlier: Decimal,
    /// Loan ids whose installment list changed and must be written back.
    pub dirty: Vec<u64>,
    /// Loan ids with every installment settled.
    pub cleared: Vec<u64>,
}

impl LoanRecovery {
    /// Loan line shown on the payslip.
    pub fn total(&self) -> Decimal {
        self.deducted_now + self.recovered_earlier
    }
}

/// Settle installments due in (`month`, `year`) that the net salary can
/// cover in full, in list order. Nothing is ever partially deducted.
pub fn apply_installments(
    net_before_loan: Decimal,
    records: &mut [LoanInstallments],
    month: u32,
    year: i32,
    now: NaiveDateTime,
) -> LoanRecovery {
    let recovered_earlier: Decimal = records
        .iter()
        .flat_map(|r| r.installments.0.iter())
        .filter(|i| i.is_paid() && i.due_in(month, year))
        .map(|i| i.amount)
        .sum();

    let mut remaining = net_before_loan - recovered_earlier;
    let mut deducted_now = Decimal::ZERO;
    let mut dirty = Vec::new();
    let mut cleared = Vec::new();

    for record in records.iter_mut() {
        let mut touched = false;
        for inst in record.installments.0.iter_mut() {
            if inst.is_paid() || !inst.due_in(month, year) {
                continue;
            }
            if remaining >= inst.amount {
                remaining -= inst.amount;
                deducted_now += inst.amount;
                inst.status = InstallmentStatus::Success;
                inst.paid_date = Some(now);
                touched = true;
            }
        }
        if touched {
            dirty.push(record.loan_id);
            if record.installments.0.iter().all(Installment::is_paid) {
                cleared.push(record.loan_id);
            }
        }
    }

    LoanRecovery {
        net_salary: remaining,
        deducted_now,
        recovered_earlier,
        dirty,
        cleared,
    }
}

/// Equal monthly installments, rounded to the rupee, with the remainder on
/// the last one. Due on the 1st of each month after `activated_on`.
pub fn build_schedule(amount: Decimal, tenure_months: u32, activated_on: NaiveDate) -> AppResult<Vec<Installment>> {
    if tenure_months == 0 {
        return Err(AppError::validation("tenure must be at least one month"));
    }
    if amount <= Decimal::ZERO {
        return Err(AppError::validation("loan amount must be positive"));
    }

    let each = round0(amount / Decimal::from(tenure_months));
    let mut year = activated_on.year();
    let mut month = activated_on.month();
    let mut schedule = Vec::with_capacity(tenure_months as usize);
    let mut allotted = Decimal::ZERO;

    for n in 1..=tenure_months {
        (year, month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let due_date = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::internal(format!("bad due date {year}-{month}")))?;
        let amount = if n == tenure_months { amount - allotted } else { each };
        allotted += amount;
        schedule.push(Installment {
            installment_number: n,
            due_date,
            amount,
            status: InstallmentStatus::Pending,
            paid_date: None,
        });
    }

    Ok(schedule)
}

/// Record one stage decision and move the loan's overall status.
pub fn decide_stage(
    loan: &mut EmployeeLoan,
    stage: LoanStage,
    approve: bool,
    approver_name: &str,
    now: NaiveDateTime,
) -> AppResult<()> {
    if loan.status != LoanStatus::Applied {
        return Err(AppError::precondition(format!(
            "loan {} is {} and can no longer be decided",
            loan.loan_id, loan.status
        )));
    }
    if loan.stage(stage).status != StageStatus::Pending {
        return Err(AppError::precondition(format!("{stage} stage already decided")));
    }

    *loan.stage_mut(stage) = ApprovalBag {
        status: if approve { StageStatus::Approved } else { StageStatus::Rejected },
        approver_name: Some(approver_name.to_string()),
        approver_time: Some(now),
    };

    let stages = [LoanStage::Manager, LoanStage::Hr, LoanStage::Accounts];
    if !approve {
        loan.status = LoanStatus::Rejected;
    } else if stages.iter().all(|s| loan.stage(*s).status == StageStatus::Approved) {
        loan.status = LoanStatus::Approved;
    }
    Ok(())
}

/// Loans can be requested only with enough frozen payslips behind them.
pub fn check_eligibility(frozen_payslips: i64) -> AppResult<()> {
    if frozen_payslips < MIN_FROZEN_PAYSLIPS {
        return Err(AppError::missing(format!(
            "loan requires {MIN_FROZEN_PAYSLIPS} frozen payslips, found {frozen_payslips}"
        )));
    }
    Ok(())
}
