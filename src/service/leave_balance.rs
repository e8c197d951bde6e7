use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::instrument;
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::engine::leave_balance::project_year;
use crate::error::{AppError, AppResult};
use crate::service::RunIssue;
use crate::store;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BalanceRun {
    pub year: i32,
    pub created: u32,
    /// Rows that already existed and were left alone.
    pub existing: u32,
    pub errors: Vec<RunIssue>,
}

/// Target year and the month its opening balance is prorated by. The month
/// is always the month of generation, whatever year is being opened.
fn projection_target(year: Option<i32>, today: NaiveDate) -> AppResult<(i32, u32)> {
    let year = year.unwrap_or(today.year());
    if !(2000..=2100).contains(&year) {
        return Err(AppError::validation(format!("year {year} out of range")));
    }
    Ok((year, today.month()))
}

/// Create missing (empid, year) balance rows for every active employee.
#[instrument(skip(pool, clock))]
pub async fn generate_leave_balances(pool: &MySqlPool, clock: &dyn Clock, year: Option<i32>) -> AppResult<BalanceRun> {
    let today = clock.today();
    let (year, month) = projection_target(year, today)?;

    let employees = store::employee::all_active(pool).await?;
    let mut run = BalanceRun {
        year,
        created: 0,
        existing: 0,
        errors: Vec::new(),
    };

    for employee in &employees {
        let row = project_year(employee.empid.clone(), year, month);
        match store::leave_balance::insert_if_absent(pool, &row).await {
            Ok(true) => run.created += 1,
            Ok(false) => run.existing += 1,
            Err(e) => {
                tracing::error!(empid = %employee.empid, error = %e, "Leave balance insert failed");
                run.errors.push(RunIssue::new(&employee.empid, &e));
            }
        }
    }

    if !employees.is_empty() && run.created == 0 && run.existing == 0 {
        return Err(AppError::internal(format!(
            "leave balance generation failed for all {} employees",
            employees.len()
        )));
    }

    tracing::info!(year, month, created = run.created, existing = run.existing, "Leave balances generated");
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::EmpId;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 15).unwrap()
    }

    #[test]
    fn defaults_to_current_year_and_month() {
        assert_eq!(projection_target(None, d(2026, 3)).unwrap(), (2026, 3));
    }

    #[test]
    fn other_years_use_the_generation_month() {
        let today = d(2026, 2);
        assert_eq!(projection_target(Some(2025), today).unwrap(), (2025, 2));
        assert_eq!(projection_target(Some(2027), today).unwrap(), (2027, 2));

        let row = project_year(EmpId::parse("1").unwrap(), 2025, 2);
        assert_eq!(row.balance_casual, dec!(11));
        assert_eq!(row.balance_sick, dec!(11));
    }

    #[test]
    fn year_outside_range_is_rejected() {
        assert!(matches!(projection_target(Some(1999), d(2026, 2)), Err(AppError::Validation(_))));
        assert!(matches!(projection_target(Some(2101), d(2026, 2)), Err(AppError::Validation(_))));
    }
}
