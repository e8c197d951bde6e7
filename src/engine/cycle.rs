use chrono::{Datelike, NaiveDate};

use crate::error::{AppError, AppResult};
use crate::model::attendance::AttendanceCycle;

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(30)
}

pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 { (year - 1, 12) } else { (year, month - 1) }
}

/// Day `day` of the month, pulled back to the month's last day when the
/// month is shorter (cycle day 31 in February is the 28th/29th).
fn clamped_date(year: i32, month: u32, day: u32) -> AppResult<NaiveDate> {
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| AppError::validation(format!("invalid date {year}-{month}-{day}")))
}

pub fn validate_month(month: u32, year: i32) -> AppResult<()> {
    if !(1..=12).contains(&month) {
        return Err(AppError::validation(format!("month must be 1..12, got {month}")));
    }
    if !(2000..=2100).contains(&year) {
        return Err(AppError::validation(format!("year out of range: {year}")));
    }
    Ok(())
}

/// The concrete date range of one payroll month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleWindow {
    pub month: u32,
    pub year: i32,
    pub first: NaiveDate,
    pub last: NaiveDate,
    /// Calendar length of the target month, not of the cycle.
    pub month_days: u32,
}

impl CycleWindow {
    pub fn resolve(cycle: &AttendanceCycle, month: u32, year: i32) -> AppResult<Self> {
        validate_month(month, year)?;
        for day in [cycle.cycle_start_day, cycle.cycle_end_day] {
            if !(1..=31).contains(&day) {
                return Err(AppError::validation(format!("cycle day out of range: {day}")));
            }
        }

        let first = if cycle.spans_two_months() {
            let (py, pm) = previous_month(year, month);
            clamped_date(py, pm, cycle.cycle_start_day)?
        } else {
            clamped_date(year, month, cycle.cycle_start_day)?
        };
        let last = clamped_date(year, month, cycle.cycle_end_day)?;

        Ok(Self {
            month,
            year,
            first,
            last,
            month_days: days_in_month(year, month),
        })
    }

    /// Inclusive day count of the cycle.
    pub fn total_days(&self) -> i64 {
        (self.last - self.first).num_days() + 1
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let last = self.last;
        self.first.iter_days().take_while(move |d| *d <= last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn cycle(start: u32, end: u32) -> AttendanceCycle {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        AttendanceCycle {
            shift_start: t(9, 30),
            shift_end: t(18, 30),
            late_log_time: t(9, 45),
            full_day_duration: t(9, 0),
            half_day_duration: t(4, 30),
            cycle_start_day: start,
            cycle_end_day: end,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2025, 12), 31);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2025, 4), 30);
    }

    #[test]
    fn cross_month_cycle_starts_in_previous_month() {
        let w = CycleWindow::resolve(&cycle(26, 25), 12, 2025).unwrap();
        assert_eq!(w.first, d(2025, 11, 26));
        assert_eq!(w.last, d(2025, 12, 25));
        assert_eq!(w.total_days(), 30);
        assert_eq!(w.month_days, 31);
    }

    #[test]
    fn january_cycle_reaches_back_into_december() {
        let w = CycleWindow::resolve(&cycle(26, 25), 1, 2026).unwrap();
        assert_eq!(w.first, d(2025, 12, 26));
        assert_eq!(w.last, d(2026, 1, 25));
    }

    #[test]
    fn in_month_cycle() {
        let w = CycleWindow::resolve(&cycle(1, 31), 2, 2025).unwrap();
        assert_eq!(w.first, d(2025, 2, 1));
        assert_eq!(w.last, d(2025, 2, 28));
        assert_eq!(w.total_days(), 28);
        assert_eq!(w.dates().count(), 28);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(CycleWindow::resolve(&cycle(1, 31), 13, 2025).is_err());
        assert!(CycleWindow::resolve(&cycle(0, 31), 1, 2025).is_err());
        assert!(CycleWindow::resolve(&cycle(1, 32), 1, 2025).is_err());
    }
}
