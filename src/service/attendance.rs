use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::instrument;

use crate::clock::Clock;
use crate::engine::attendance::MonthContext;
use crate::engine::calendar::CalendarSnapshot;
use crate::engine::classifier::DayView;
use crate::engine::cycle::{CycleWindow, validate_month};
use crate::engine::punch::PunchPair;
use crate::error::{AppError, AppResult};
use crate::model::attendance::{AttendanceCycle, DayRecord, PunchEvent, PunchKind};
use crate::model::employee::EmpId;
use crate::service::RunReport;
use crate::store::{self, attendance::NewPunch, lock::RunLock};
use crate::utils::run_flags::{self, RunKey, RunKind};

type PunchIndex = HashMap<EmpId, HashMap<NaiveDate, PunchPair>>;

/// Fold raw punches into one first/last pair per (empid, date).
fn index_punches(punches: &[PunchEvent]) -> PunchIndex {
    let mut grouped: HashMap<EmpId, HashMap<NaiveDate, Vec<&PunchEvent>>> = HashMap::new();
    for punch in punches {
        grouped
            .entry(punch.empid.clone())
            .or_default()
            .entry(punch.punch_date)
            .or_default()
            .push(punch);
    }

    grouped
        .into_iter()
        .map(|(empid, days)| {
            let days = days
                .into_iter()
                .map(|(date, events)| (date, PunchPair::aggregate(events)))
                .collect();
            (empid, days)
        })
        .collect()
}

/// Derive and store attendance summaries for every employee in service
/// during the (month, year) cycle, or just `only`.
#[instrument(skip(pool), fields(run_id))]
pub async fn build_attendance(pool: &MySqlPool, month: u32, year: i32, only: Option<EmpId>) -> AppResult<RunReport> {
    validate_month(month, year)?;
    if let Some(empid) = &only {
        store::employee::require(pool, empid).await?;
    }

    let lock = RunLock::acquire(pool, store::lock::attendance_key(month, year)).await?;
    let key = RunKey::new(RunKind::Attendance, month, year);
    run_flags::register(key).await;

    let result = run_build(pool, key, only.as_ref()).await;

    run_flags::finish(key).await;
    if let Err(e) = lock.release().await {
        tracing::warn!(error = %e, "Failed to release attendance lock");
    }
    result?.require_rows("attendance rows")
}

async fn run_build(pool: &MySqlPool, key: RunKey, only: Option<&EmpId>) -> AppResult<RunReport> {
    let mut report = RunReport::new(key.month, key.year);
    tracing::Span::current().record("run_id", report.run_id.as_str());

    // One snapshot for every input of the run.
    let mut tx = pool.begin().await?;
    let cycle = store::attendance::load_cycle(&mut *tx).await?;
    let window = CycleWindow::resolve(&cycle, key.month, key.year)?;
    let employees = store::employee::in_service_between(&mut *tx, window.first, window.last, only).await?;
    let week_offs = store::calendar::week_offs_between(&mut *tx, window.first, window.last).await?;
    let holidays = store::calendar::holidays_between(&mut *tx, window.first, window.last).await?;
    let leaves = store::calendar::approved_leaves_between(&mut *tx, window.first, window.last, only).await?;
    let punches = store::attendance::punches_between(&mut *tx, window.first, window.last, only).await?;
    tx.commit().await?;

    tracing::info!(
        employees = employees.len(),
        punches = punches.len(),
        first = %window.first,
        last = %window.last,
        "Attendance inputs loaded"
    );

    let calendar = CalendarSnapshot::new(week_offs, holidays, leaves);
    let punches = index_punches(&punches);
    let ctx = MonthContext {
        window: &window,
        cycle: &cycle,
        calendar: &calendar,
    };
    let no_punches = HashMap::new();

    for employee in &employees {
        if run_flags::is_cancelled(key).await {
            tracing::warn!(run_id = %report.run_id, generated = report.generated, "Attendance run cancelled");
            report.cancelled = true;
            break;
        }

        let days = punches.get(&employee.empid).unwrap_or(&no_punches);
        let Some(outcome) = ctx.build(employee, days) else {
            report.skip(&employee.empid, "not in service during the cycle");
            continue;
        };

        match store::attendance::upsert_summary(pool, &outcome.summary).await {
            Ok(()) => {
                tracing::debug!(empid = %employee.empid, payble_days = %outcome.summary.payble_days, "Summary stored");
                report.generated += 1;
            }
            Err(e) => report.record_failure(&employee.empid, &e),
        }
    }

    tracing::info!(
        run_id = %report.run_id,
        generated = report.generated,
        skipped = report.skipped.len(),
        errors = report.errors.len(),
        "Attendance run finished"
    );
    Ok(report)
}

/// Recompute the stored first/last punch of one day.
pub(crate) async fn reconcile_day(conn: &mut MySqlConnection, empid: &EmpId, date: NaiveDate) -> AppResult<DayRecord> {
    let punches = store::attendance::punches_on(&mut *conn, empid, date).await?;
    let pair = PunchPair::aggregate(&punches);
    let day = DayRecord {
        empid: empid.clone(),
        work_date: date,
        in_time: pair.in_time,
        out_time: pair.out_time,
        hours: pair.hours(),
    };
    store::attendance::upsert_day(&mut *conn, &day).await?;
    Ok(day)
}

#[derive(Debug, Default)]
pub struct PunchInput {
    pub kind: Option<PunchKind>,
    pub location: Option<String>,
    pub image_ref: Option<String>,
}

/// Store a punch at the current instant and refresh that day's in/out.
#[instrument(skip(pool, clock, input))]
pub async fn record_punch(pool: &MySqlPool, clock: &dyn Clock, empid: &EmpId, input: PunchInput) -> AppResult<(u64, DayRecord)> {
    let now = clock.now();
    let mut tx = pool.begin().await?;
    store::employee::require(&mut *tx, empid).await?;

    let punch_id = store::attendance::insert_punch(
        &mut *tx,
        NewPunch {
            empid,
            at: now,
            kind: input.kind.unwrap_or(PunchKind::Mobile),
            location: input.location.as_deref(),
            image_ref: input.image_ref.as_deref(),
        },
    )
    .await?;
    let day = reconcile_day(&mut *tx, empid, now.date()).await?;
    tx.commit().await?;

    tracing::info!(punch_id, at = %now, "Punch recorded");
    Ok((punch_id, day))
}

pub async fn get_cycle(pool: &MySqlPool) -> AppResult<AttendanceCycle> {
    store::attendance::load_cycle(pool).await
}

fn validate_cycle(cycle: &AttendanceCycle) -> AppResult<()> {
    for (name, day) in [("cycle_start_day", cycle.cycle_start_day), ("cycle_end_day", cycle.cycle_end_day)] {
        if !(1..=31).contains(&day) {
            return Err(AppError::validation(format!("{name} must be within 1..31, got {day}")));
        }
    }
    if cycle.half_day() > cycle.full_day() {
        return Err(AppError::validation("half_day_duration cannot exceed full_day_duration"));
    }
    if cycle.shift_start >= cycle.shift_end {
        return Err(AppError::validation("shift_start must be before shift_end"));
    }
    Ok(())
}

/// Replace the singleton cycle row under a row lock.
#[instrument(skip(pool, cycle))]
pub async fn update_cycle(pool: &MySqlPool, cycle: AttendanceCycle) -> AppResult<AttendanceCycle> {
    validate_cycle(&cycle)?;

    let mut tx = pool.begin().await?;
    let previous = store::attendance::lock_cycle(&mut *tx).await?;
    store::attendance::save_cycle(&mut *tx, &cycle).await?;
    tx.commit().await?;

    tracing::info!(?previous, current = ?cycle, "Attendance cycle updated");
    Ok(cycle)
}

/// Day-by-day statuses of one employee for a cycle, read from the
/// reconciled day rows.
pub async fn day_views(pool: &MySqlPool, empid: &EmpId, month: u32, year: i32) -> AppResult<Vec<DayView>> {
    validate_month(month, year)?;
    let employee = store::employee::find(pool, empid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("employee {empid} not found")))?;

    let cycle = store::attendance::load_cycle(pool).await?;
    let window = CycleWindow::resolve(&cycle, month, year)?;
    let week_offs = store::calendar::week_offs_between(pool, window.first, window.last).await?;
    let holidays = store::calendar::holidays_between(pool, window.first, window.last).await?;
    let leaves = store::calendar::approved_leaves_between(pool, window.first, window.last, Some(empid)).await?;
    let days = store::attendance::days_between(pool, empid, window.first, window.last).await?;

    let punches: HashMap<NaiveDate, PunchPair> = days
        .into_iter()
        .map(|d| (d.work_date, PunchPair::from_times(d.in_time.into_iter().chain(d.out_time))))
        .collect();

    let calendar = CalendarSnapshot::new(week_offs, holidays, leaves);
    let ctx = MonthContext {
        window: &window,
        cycle: &cycle,
        calendar: &calendar,
    };
    Ok(ctx.day_views(&employee, &punches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn cycle() -> AttendanceCycle {
        AttendanceCycle {
            shift_start: t(9, 30),
            shift_end: t(18, 30),
            late_log_time: t(9, 45),
            full_day_duration: t(9, 0),
            half_day_duration: t(4, 30),
            cycle_start_day: 26,
            cycle_end_day: 25,
        }
    }

    fn punch(empid: &str, day: u32, h: u32, m: u32) -> PunchEvent {
        let date = NaiveDate::from_ymd_opt(2025, 12, day).unwrap();
        PunchEvent {
            id: 0,
            empid: EmpId::parse(empid).unwrap(),
            punch_date: date,
            punch_time: date.and_time(t(h, m)),
            kind: Some(PunchKind::Mobile),
            location: None,
            image_ref: None,
        }
    }

    #[test]
    fn punches_are_grouped_per_employee_and_day() {
        let punches = vec![
            punch("1001", 1, 18, 30),
            punch("1001", 1, 9, 30),
            punch("1001", 1, 13, 0),
            punch("1001", 2, 9, 0),
            punch("1002", 1, 10, 0),
        ];
        let index = index_punches(&punches);

        let day1 = index[&EmpId::parse("1001").unwrap()][&NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()];
        assert_eq!(day1.in_time.unwrap().time(), t(9, 30));
        assert_eq!(day1.out_time.unwrap().time(), t(18, 30));
        assert_eq!(index[&EmpId::parse("1001").unwrap()].len(), 2);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn default_cycle_is_valid() {
        assert!(validate_cycle(&cycle()).is_ok());
    }

    #[test]
    fn cycle_days_must_be_calendar_days() {
        let mut c = cycle();
        c.cycle_start_day = 0;
        assert!(matches!(validate_cycle(&c), Err(AppError::Validation(_))));
        c.cycle_start_day = 32;
        assert!(validate_cycle(&c).is_err());
    }

    #[test]
    fn half_day_cannot_exceed_full_day() {
        let mut c = cycle();
        c.half_day_duration = t(9, 30);
        assert!(validate_cycle(&c).is_err());
    }
}
