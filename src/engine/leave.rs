//! Validation rules for leave applications.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::engine::calendar::CalendarSnapshot;
use crate::error::{AppError, AppResult};
use crate::model::employee::Employee;
use crate::model::leave_request::{ApprovalStatus, LeaveRequest, LeaveType};

/// A leave application as submitted.
#[derive(Debug, Clone)]
pub struct LeaveApplication {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub leave_type: LeaveType,
    pub half_from: bool,
    pub half_to: bool,
}

/// Check an application against the calendar and the employee's existing
/// leaves. Returns the chargeable duration in days.
pub fn validate_application(
    employee: &Employee,
    app: &LeaveApplication,
    calendar: &CalendarSnapshot,
    existing: &[LeaveRequest],
) -> AppResult<Decimal> {
    if app.from > app.to {
        return Err(AppError::validation("from_date cannot be after to_date"));
    }
    if (app.to - app.from).num_days() > 366 {
        return Err(AppError::validation("leave cannot span more than a year"));
    }
    if app.from == app.to && app.half_from && app.half_to {
        return Err(AppError::validation("a single day leave takes one half-day marker at most"));
    }

    let is_off = |date: NaiveDate| calendar.is_week_off(&employee.empid, date) || calendar.is_holiday(employee, date);
    for endpoint in [app.from, app.to] {
        if is_off(endpoint) {
            return Err(AppError::validation(format!(
                "leave cannot start or end on a week-off or holiday ({endpoint})"
            )));
        }
    }

    if let Some(clash) = existing.iter().find(|l| {
        l.empid == employee.empid
            && l.leave_type == app.leave_type
            && l.status != ApprovalStatus::Rejected
            && l.overlaps(app.from, app.to)
    }) {
        return Err(AppError::validation(format!(
            "overlaps {} leave #{} ({} to {})",
            clash.leave_type, clash.id, clash.from_date, clash.to_date
        )));
    }

    let working_days = app
        .from
        .iter_days()
        .take_while(|d| *d <= app.to)
        .filter(|d| !is_off(*d))
        .count();

    let mut duration = Decimal::from(working_days);
    if app.half_from {
        duration -= dec!(0.5);
    }
    if app.half_to {
        duration -= dec!(0.5);
    }
    if duration <= Decimal::ZERO {
        return Err(AppError::validation("leave covers no working day"));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::calendar::{Holiday, HolidayPermissions, WeekOffEntry, WeekOffScope};
    use crate::model::employee::EmpId;
    use sqlx::types::Json;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, day).unwrap()
    }

    fn calendar() -> CalendarSnapshot {
        CalendarSnapshot::new(
            vec![
                WeekOffEntry { scope: WeekOffScope::All, date: d(13) },
                WeekOffEntry { scope: WeekOffScope::All, date: d(14) },
            ],
            vec![Holiday {
                id: 1,
                holiday_date: d(11),
                name: "Local".into(),
                holiday_permissions: Some(Json(HolidayPermissions([1].into()))),
            }],
            vec![],
        )
    }

    fn app(from: u32, to: u32, leave_type: LeaveType) -> LeaveApplication {
        LeaveApplication {
            from: d(from),
            to: d(to),
            leave_type,
            half_from: false,
            half_to: false,
        }
    }

    fn existing(from: u32, to: u32, leave_type: LeaveType, status: ApprovalStatus) -> LeaveRequest {
        LeaveRequest {
            id: 4,
            empid: EmpId::parse("1001").unwrap(),
            from_date: d(from),
            to_date: d(to),
            leave_type,
            status,
            duration: dec!(1),
            half_from: false,
            half_to: false,
            reason: None,
            decided_by: None,
            created_at: None,
        }
    }

    #[test]
    fn duration_skips_offs_inside_range() {
        let e = Employee::sample("1001");
        // 10..16 minus holiday 11 and weekend 13, 14
        let days = validate_application(&e, &app(10, 16, LeaveType::Casual), &calendar(), &[]).unwrap();
        assert_eq!(days, dec!(4));
    }

    #[test]
    fn half_markers_reduce_duration() {
        let e = Employee::sample("1001");
        let mut a = app(15, 16, LeaveType::Sick);
        a.half_from = true;
        a.half_to = true;
        assert_eq!(validate_application(&e, &a, &calendar(), &[]).unwrap(), dec!(1));

        let mut single = app(15, 15, LeaveType::Sick);
        single.half_to = true;
        assert_eq!(validate_application(&e, &single, &calendar(), &[]).unwrap(), dec!(0.5));
        single.half_from = true;
        assert!(validate_application(&e, &single, &calendar(), &[]).is_err());
    }

    #[test]
    fn rejects_reversed_dates_and_off_endpoints() {
        let e = Employee::sample("1001");
        assert!(validate_application(&e, &app(16, 15, LeaveType::Casual), &calendar(), &[]).is_err());
        assert!(validate_application(&e, &app(11, 12, LeaveType::Casual), &calendar(), &[]).is_err());
        assert!(validate_application(&e, &app(12, 13, LeaveType::Casual), &calendar(), &[]).is_err());
    }

    #[test]
    fn holiday_endpoint_only_blocks_matching_branch() {
        let mut e = Employee::sample("1001");
        e.branch_id = Some(2);
        assert!(validate_application(&e, &app(11, 12, LeaveType::Casual), &calendar(), &[]).is_ok());
    }

    #[test]
    fn overlap_only_with_same_type_and_live_status() {
        let e = Employee::sample("1001");
        let a = app(15, 17, LeaveType::Casual);
        let pending = existing(17, 18, LeaveType::Casual, ApprovalStatus::Pending);
        assert!(validate_application(&e, &a, &calendar(), &[pending]).is_err());

        let approved = existing(12, 15, LeaveType::Casual, ApprovalStatus::Approved);
        assert!(validate_application(&e, &a, &calendar(), &[approved]).is_err());

        let rejected = existing(15, 17, LeaveType::Casual, ApprovalStatus::Rejected);
        assert!(validate_application(&e, &a, &calendar(), &[rejected]).is_ok());

        let other_type = existing(15, 17, LeaveType::Sick, ApprovalStatus::Approved);
        assert!(validate_application(&e, &a, &calendar(), &[other_type]).is_ok());
    }
}
