use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::MySqlPool;
use sqlx::types::Json;
use tracing::instrument;
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::engine::cycle::validate_month;
use crate::engine::loan::{LoanRecovery, apply_installments};
use crate::engine::payslip::{PayableDays, PayslipDraft, calculate};
use crate::engine::salary::{self, ResolvedSalary};
use crate::error::{AppError, AppResult};
use crate::model::attendance::AttendanceSummary;
use crate::model::employee::{BankDetails, EmpId, Employee};
use crate::model::payslip::Payslip;
use crate::model::salary::PayrollGroup;
use crate::service::RunReport;
use crate::service::notify::{Notification, Notifier, dispatch};
use crate::store::{self, employee::Cohort, lock::RunLock};
use crate::utils::group_cache;
use crate::utils::run_flags::{self, RunKey, RunKind};

/// No annual TDS figure is sourced yet; the monthly line stays at zero.
const ANNUAL_TDS: Decimal = Decimal::ZERO;

enum Generated {
    Written,
    Frozen,
}

/// Compute and store payslips for every employee of `cohort`.
#[instrument(skip(pool, clock), fields(run_id))]
pub async fn generate_payslips(
    pool: &MySqlPool,
    clock: &dyn Clock,
    month: u32,
    year: i32,
    cohort: Cohort,
) -> AppResult<RunReport> {
    validate_month(month, year)?;
    let employees = store::employee::in_cohort(pool, &cohort).await?;
    if employees.is_empty() {
        return Err(AppError::validation(format!("no employees match {cohort:?}")));
    }

    let lock = RunLock::acquire(pool, store::lock::payroll_key(month, year)).await?;
    let key = RunKey::new(RunKind::Payroll, month, year);
    run_flags::register(key).await;

    let mut report = RunReport::new(month, year);
    tracing::Span::current().record("run_id", report.run_id.as_str());
    tracing::info!(employees = employees.len(), "Payroll run started");

    for employee in &employees {
        if run_flags::is_cancelled(key).await {
            tracing::warn!(run_id = %report.run_id, generated = report.generated, "Payroll run cancelled");
            report.cancelled = true;
            break;
        }

        match generate_one(pool, clock, employee, month, year).await {
            Ok(Generated::Written) => report.generated += 1,
            Ok(Generated::Frozen) => report.skip(&employee.empid, "payslip is frozen"),
            Err(e) => report.record_failure(&employee.empid, &e),
        }
    }

    run_flags::finish(key).await;
    if let Err(e) = lock.release().await {
        tracing::warn!(error = %e, "Failed to release payroll lock");
    }

    tracing::info!(
        run_id = %report.run_id,
        generated = report.generated,
        skipped = report.skipped.len(),
        errors = report.errors.len(),
        "Payroll run finished"
    );
    report.into_result("payslips")
}

/// One employee-month: calculate, settle loan installments and write the
/// payslip in a single transaction.
async fn generate_one(
    pool: &MySqlPool,
    clock: &dyn Clock,
    employee: &Employee,
    month: u32,
    year: i32,
) -> AppResult<Generated> {
    let empid = &employee.empid;
    let numeric = empid.require_numeric()?;

    let summary = store::attendance::find_summary(pool, empid, month, year)
        .await?
        .ok_or_else(|| AppError::missing(format!("no attendance summary for {empid} in {month:02}/{year}")))?;
    let structure = store::salary::find_structure(pool, empid).await?;
    let salary = salary::resolve(employee, structure.as_ref())?;
    let group = group_cache::group_of(pool, empid).await?;
    let draft = calculate(PayableDays::from(&summary), &salary, group, ANNUAL_TDS);

    let mut tx = pool.begin().await?;
    if store::payslip::lock_freeze_flag(&mut *tx, numeric, month, year).await? == Some(true) {
        return Ok(Generated::Frozen);
    }

    let now = clock.now();
    let mut loans = store::loan::lock_active_installments(&mut *tx, empid).await?;
    let recovery = apply_installments(draft.net_before_loan, &mut loans, month, year, now);
    for record in loans.iter().filter(|r| recovery.dirty.contains(&r.loan_id)) {
        store::loan::save_installments(&mut *tx, record).await?;
    }
    for loan_id in &recovery.cleared {
        store::loan::mark_cleared(&mut *tx, *loan_id).await?;
        tracing::info!(%empid, loan_id, "Loan cleared");
    }

    let payslip = assemble(numeric, employee, &summary, &salary, draft, &recovery, now);
    store::payslip::upsert(&mut *tx, &payslip).await?;
    tx.commit().await?;

    tracing::debug!(
        %empid,
        net_salary = %payslip.net_salary,
        loan_now = %recovery.deducted_now,
        "Payslip stored"
    );
    Ok(Generated::Written)
}

fn assemble(
    numeric: i64,
    employee: &Employee,
    summary: &AttendanceSummary,
    salary: &ResolvedSalary,
    draft: PayslipDraft,
    recovery: &LoanRecovery,
    now: chrono::NaiveDateTime,
) -> Payslip {
    let mut deductions = draft.deductions;
    deductions.loan = recovery.total();
    let bank = &salary.bank;

    Payslip {
        empid: numeric,
        month: summary.month,
        year: summary.year,
        name: employee.name.clone(),
        doj: employee.doj,
        branch_id: employee.branch_id,
        department_id: employee.department_id,
        total_days: summary.total_days,
        payable_days: summary.payble_days,
        gross_salary: salary.monthly_gross,
        bank_name: bank.bank_name.clone(),
        account_no: bank.account_no.clone(),
        ifsc: bank.ifsc.clone(),
        pan: bank.pan.clone(),
        pf_no: bank.pf_no.clone(),
        esi_no: bank.esi_no.clone(),
        earnings: Json(draft.earnings),
        deductions: Json(deductions),
        earned_gross: draft.earned_gross,
        net_salary: recovery.net_salary,
        freaze_status: false,
        generated_at: Some(now),
        updated_date: None,
        updated_by: None,
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FreezeOutcome {
    pub month: u32,
    pub year: i32,
    pub prior_frozen: bool,
    pub frozen: bool,
    pub affected: u64,
}

/// Flip the freeze flag of a whole (month, year) cohort. The cohort counts
/// as frozen only when every row is.
#[instrument(skip(pool, clock, notifier))]
pub async fn toggle_freeze(
    pool: &MySqlPool,
    clock: &dyn Clock,
    notifier: Arc<dyn Notifier>,
    month: u32,
    year: i32,
    by: &str,
) -> AppResult<FreezeOutcome> {
    validate_month(month, year)?;
    let lock = RunLock::acquire(pool, store::lock::payroll_key(month, year)).await?;
    let result = flip_freeze(pool, clock, month, year, by).await;
    if let Err(e) = lock.release().await {
        tracing::warn!(error = %e, "Failed to release payroll lock");
    }
    let outcome = result?;

    tracing::info!(
        prior = outcome.prior_frozen,
        frozen = outcome.frozen,
        affected = outcome.affected,
        "Payslip freeze toggled"
    );
    dispatch(
        notifier,
        Notification::PayslipsFrozen {
            month,
            year,
            frozen: outcome.frozen,
            affected: outcome.affected,
        },
    );
    Ok(outcome)
}

async fn flip_freeze(pool: &MySqlPool, clock: &dyn Clock, month: u32, year: i32, by: &str) -> AppResult<FreezeOutcome> {
    let mut tx = pool.begin().await?;
    let (total, frozen) = store::payslip::freeze_counts(&mut *tx, month, year).await?;
    if total == 0 {
        return Err(AppError::precondition(format!("no payslips for {month:02}/{year}")));
    }

    let prior_frozen = frozen == total;
    let affected = store::payslip::set_freeze(&mut *tx, month, year, !prior_frozen, by, clock.now()).await?;
    tx.commit().await?;

    Ok(FreezeOutcome {
        month,
        year,
        prior_frozen,
        frozen: !prior_frozen,
        affected,
    })
}

/// Write bank identifiers onto every stored payslip of `empid`.
#[instrument(skip(pool, clock, bank))]
pub async fn backfill_bank(pool: &MySqlPool, clock: &dyn Clock, empid: &EmpId, bank: &BankDetails, by: &str) -> AppResult<u64> {
    let numeric = empid.require_numeric()?;
    store::employee::require(pool, empid).await?;

    let affected = store::payslip::backfill_bank(pool, numeric, &bank.normalized(), by, clock.now()).await?;
    if affected == 0 {
        return Err(AppError::not_found(format!("no payslips for employee {empid}")));
    }
    tracing::info!(affected, "Bank details backfilled");
    Ok(affected)
}

/// Tag or untag an employee's payroll group.
#[instrument(skip(pool))]
pub async fn set_group(pool: &MySqlPool, empid: &EmpId, group: Option<PayrollGroup>) -> AppResult<()> {
    store::employee::require(pool, empid).await?;
    store::salary::set_group(pool, empid, group).await?;
    group_cache::invalidate(empid).await;
    tracing::info!(?group, "Payroll group updated");
    Ok(())
}
