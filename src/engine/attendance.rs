//! Monthly attendance derivation for one employee.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::engine::calendar::{CalendarSnapshot, ServiceSpan};
use crate::engine::classifier::{DayClassifier, DayStatus, DayView};
use crate::engine::cycle::CycleWindow;
use crate::engine::punch::PunchPair;
use crate::engine::rounding::round_payable_days;
use crate::model::attendance::{AttendanceCycle, AttendanceSummary};
use crate::model::employee::Employee;
use crate::model::leave_request::LeaveType;

/// Raw day counts before offsets and rounding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthTally {
    pub week_offs: i32,
    pub holidays: i32,
    pub presents: i32,
    pub half_days: Decimal,
    pub cl: Decimal,
    pub sl: Decimal,
    pub comp_offs: Decimal,
    pub lop_leaves: Decimal,
    pub other_leaves: Decimal,
    pub raw_late_logs: i32,
    pub potential_absents: i32,
}

impl MonthTally {
    fn record(&mut self, status: DayStatus) {
        if status.is_late() {
            self.raw_late_logs += 1;
        }
        match status {
            DayStatus::OutOfService => {}
            DayStatus::WeekOff => self.week_offs += 1,
            DayStatus::Holiday => self.holidays += 1,
            DayStatus::Present { .. } => self.presents += 1,
            DayStatus::HalfDay { .. } => self.half_days += dec!(0.5),
            DayStatus::Absent => self.potential_absents += 1,
            DayStatus::Leave(day) => {
                let bucket = match day.leave_type {
                    LeaveType::Casual => &mut self.cl,
                    LeaveType::Sick => &mut self.sl,
                    LeaveType::CompOff => &mut self.comp_offs,
                    LeaveType::Lop => &mut self.lop_leaves,
                    LeaveType::Other => &mut self.other_leaves,
                };
                *bucket += day.share;
            }
        }
    }

    pub fn paid_leaves(&self) -> Decimal {
        self.cl + self.sl + self.comp_offs
    }
}

/// Everything derived for one employee in one cycle.
#[derive(Debug, Clone)]
pub struct AttendanceOutcome {
    pub summary: AttendanceSummary,
    pub tally: MonthTally,
    pub span: ServiceSpan,
    pub raw_payable: Decimal,
    pub late_deduction_days: Decimal,
}

/// Shared inputs of one attendance run.
pub struct MonthContext<'a> {
    pub window: &'a CycleWindow,
    pub cycle: &'a AttendanceCycle,
    pub calendar: &'a CalendarSnapshot,
}

impl<'a> MonthContext<'a> {
    fn classifier(&self, employee: &'a Employee) -> DayClassifier<'a> {
        DayClassifier {
            employee,
            span: ServiceSpan::resolve(employee, self.window),
            calendar: self.calendar,
            cycle: self.cycle,
        }
    }

    /// Day-by-day statuses across the whole cycle, for calendar views.
    pub fn day_views(&self, employee: &'a Employee, punches: &HashMap<NaiveDate, PunchPair>) -> Vec<DayView> {
        let classifier = self.classifier(employee);
        self.window
            .dates()
            .map(|date| classifier.view(date, &punches.get(&date).copied().unwrap_or_default()))
            .collect()
    }

    /// Derive the month for `employee`. `None` when the employee was not in
    /// service on any day of the cycle.
    pub fn build(&self, employee: &'a Employee, punches: &HashMap<NaiveDate, PunchPair>) -> Option<AttendanceOutcome> {
        let classifier = self.classifier(employee);
        let span = classifier.span?;

        let mut tally = MonthTally::default();
        for date in span.dates() {
            let pair = punches.get(&date).copied().unwrap_or_default();
            tally.record(classifier.classify(date, &pair));
        }

        let late_logs = if employee.is_late { tally.raw_late_logs } else { 0 };
        let paid_leaves = tally.paid_leaves();
        let absents = (Decimal::from(tally.potential_absents) - paid_leaves).max(Decimal::ZERO);
        let late_deduction_days = Decimal::from(late_logs / 3) * dec!(0.5);
        let emp_total_days = span.total_days();

        let raw_payable = Decimal::from(tally.presents)
            + tally.half_days
            + paid_leaves
            + Decimal::from(tally.week_offs)
            + Decimal::from(tally.holidays)
            - late_deduction_days;
        let scaled_payable =
            raw_payable / Decimal::from(self.window.total_days()) * Decimal::from(self.window.month_days);
        let payble_days = round_payable_days(scaled_payable);
        let lops = (Decimal::from(emp_total_days) - raw_payable).max(Decimal::ZERO);

        let working_days = emp_total_days as i32 - tally.week_offs - tally.holidays;

        let summary = AttendanceSummary {
            empid: employee.empid.clone(),
            name: employee.name.clone(),
            doj: employee.doj,
            month: self.window.month,
            year: self.window.year,
            total_days: self.window.month_days as i32,
            working_days,
            week_offs: tally.week_offs,
            holidays: tally.holidays,
            presents: tally.presents,
            absents,
            half_days: tally.half_days,
            late_logs,
            cl: tally.cl,
            sl: tally.sl,
            comp_offs: tally.comp_offs,
            lops,
            payble_days,
            status: 1,
        };

        Some(AttendanceOutcome {
            summary,
            tally,
            span,
            raw_payable,
            late_deduction_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::calendar::{Holiday, HolidayPermissions, WeekOffEntry, WeekOffScope};
    use crate::model::employee::EmpId;
    use crate::model::leave_request::{ApprovalStatus, LeaveRequest};
    use chrono::{Datelike, NaiveTime, Weekday};
    use sqlx::types::Json;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
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

    fn window() -> CycleWindow {
        CycleWindow::resolve(&cycle(), 12, 2025).unwrap()
    }

    fn weekend_offs(w: &CycleWindow) -> Vec<WeekOffEntry> {
        w.dates()
            .filter(|d| matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .map(|date| WeekOffEntry { scope: WeekOffScope::All, date })
            .collect()
    }

    fn weekday_punches(w: &CycleWindow, in_at: NaiveTime, out_at: NaiveTime) -> HashMap<NaiveDate, PunchPair> {
        w.dates()
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .map(|date| {
                (
                    date,
                    PunchPair::from_times([date.and_time(in_at), date.and_time(out_at)]),
                )
            })
            .collect()
    }

    fn employee() -> Employee {
        let mut e = Employee::sample("1001");
        e.doj = NaiveDate::from_ymd_opt(2020, 1, 1);
        e.branch_id = Some(1);
        e
    }

    fn christmas() -> Holiday {
        Holiday {
            id: 1,
            holiday_date: d(12, 25),
            name: "Christmas".into(),
            holiday_permissions: Some(Json(HolidayPermissions([1, 2].into()))),
        }
    }

    fn casual(from: NaiveDate, to: NaiveDate) -> LeaveRequest {
        LeaveRequest {
            id: 5,
            empid: EmpId::parse("1001").unwrap(),
            from_date: from,
            to_date: to,
            leave_type: LeaveType::Casual,
            status: ApprovalStatus::Approved,
            duration: dec!(3),
            half_from: false,
            half_to: false,
            reason: None,
            decided_by: None,
            created_at: None,
        }
    }

    #[test]
    fn basic_month_every_weekday_present() {
        let w = window();
        let calendar = CalendarSnapshot::new(weekend_offs(&w), vec![], vec![]);
        let cycle = cycle();
        let ctx = MonthContext { window: &w, cycle: &cycle, calendar: &calendar };
        let emp = employee();
        let out = ctx.build(&emp, &weekday_punches(&w, t(9, 30), t(18, 30))).unwrap();
        let s = &out.summary;

        assert_eq!(s.presents, 22);
        assert_eq!(s.week_offs, 8);
        assert_eq!(s.half_days, dec!(0));
        assert_eq!(s.absents, dec!(0));
        assert_eq!(s.late_logs, 0);
        assert_eq!(s.lops, dec!(0));
        assert_eq!(s.total_days, 31);
        assert_eq!(s.working_days, 22);
        assert_eq!(out.raw_payable, dec!(30));
        assert_eq!(s.payble_days, dec!(31));
        assert_eq!(s.status, 1);
    }

    #[test]
    fn holiday_beats_punches() {
        let w = window();
        let calendar = CalendarSnapshot::new(weekend_offs(&w), vec![christmas()], vec![]);
        let cycle = cycle();
        let ctx = MonthContext { window: &w, cycle: &cycle, calendar: &calendar };
        let emp = employee();
        let out = ctx.build(&emp, &weekday_punches(&w, t(9, 30), t(18, 30))).unwrap();

        assert_eq!(out.summary.holidays, 1);
        assert_eq!(out.summary.presents, 21);
        assert_eq!(out.raw_payable, dec!(30));
    }

    #[test]
    fn holiday_inside_leave_counts_as_holiday() {
        let w = window();
        let mut holiday = christmas();
        holiday.holiday_date = d(12, 11);
        let calendar = CalendarSnapshot::new(
            weekend_offs(&w),
            vec![holiday],
            vec![casual(d(12, 10), d(12, 12))],
        );
        let cycle = cycle();
        let ctx = MonthContext { window: &w, cycle: &cycle, calendar: &calendar };
        let emp = employee();
        let out = ctx.build(&emp, &weekday_punches(&w, t(9, 30), t(18, 30))).unwrap();

        assert_eq!(out.summary.cl, dec!(2));
        assert_eq!(out.summary.holidays, 1);
        assert_eq!(out.summary.presents, 19);
        assert_eq!(out.raw_payable, dec!(30));
        assert_eq!(out.summary.payble_days, dec!(31));
    }

    fn late_month(is_late: bool) -> AttendanceOutcome {
        let w = window();
        let calendar = CalendarSnapshot::new(weekend_offs(&w), vec![], vec![]);
        let cycle = cycle();
        let ctx = MonthContext { window: &w, cycle: &cycle, calendar: &calendar };
        let mut emp = employee();
        emp.is_late = is_late;

        let mut punches = weekday_punches(&w, t(9, 30), t(18, 30));
        for day in [1, 2, 3, 4, 5, 8] {
            let date = d(12, day);
            punches.insert(date, PunchPair::from_times([date.and_time(t(10, 0)), date.and_time(t(19, 30))]));
        }
        ctx.build(&emp, &punches).unwrap()
    }

    #[test]
    fn six_late_logs_cost_one_day() {
        let out = late_month(true);
        assert_eq!(out.summary.late_logs, 6);
        assert_eq!(out.late_deduction_days, dec!(1.0));
        assert_eq!(out.raw_payable, dec!(29));
        assert_eq!(out.summary.lops, dec!(1));
        // 29 / 30 * 31 = 29.97 -> 30.0
        assert_eq!(out.summary.payble_days, dec!(30));
    }

    #[test]
    fn late_logs_ignored_when_not_tracked() {
        let out = late_month(false);
        assert_eq!(out.tally.raw_late_logs, 6);
        assert_eq!(out.summary.late_logs, 0);
        assert_eq!(out.late_deduction_days, dec!(0));
        assert_eq!(out.raw_payable, dec!(30));
        assert_eq!(out.summary.payble_days, dec!(31));
    }

    #[test]
    fn absences_offset_by_paid_leave_and_lops_from_raw() {
        let w = window();
        let calendar = CalendarSnapshot::new(weekend_offs(&w), vec![], vec![casual(d(12, 1), d(12, 1))]);
        let cycle = cycle();
        let ctx = MonthContext { window: &w, cycle: &cycle, calendar: &calendar };
        let emp = employee();
        let mut punches = weekday_punches(&w, t(9, 30), t(18, 30));
        for day in [2, 3, 4] {
            punches.remove(&d(12, day));
        }
        punches.insert(d(12, 5), PunchPair::from_times([d(12, 5).and_time(t(9, 30)), d(12, 5).and_time(t(15, 0))]));

        let out = ctx.build(&emp, &punches).unwrap();
        let s = &out.summary;
        assert_eq!(out.tally.potential_absents, 3);
        assert_eq!(s.cl, dec!(1));
        assert_eq!(s.absents, dec!(2));
        assert_eq!(s.half_days, dec!(0.5));
        assert_eq!(s.presents, 17);
        // 17 + 0.5 + 1 + 8 = 26.5
        assert_eq!(out.raw_payable, dec!(26.5));
        assert_eq!(s.lops, dec!(3.5));
        // 26.5 / 30 * 31 = 27.38 -> 27.4 -> 27.5
        assert_eq!(s.payble_days, dec!(27.5));
    }

    #[test]
    fn mid_cycle_joiner_counts_only_service_days() {
        let w = window();
        let calendar = CalendarSnapshot::new(weekend_offs(&w), vec![], vec![]);
        let cycle = cycle();
        let ctx = MonthContext { window: &w, cycle: &cycle, calendar: &calendar };
        let mut emp = employee();
        emp.doj = Some(d(12, 15));
        let out = ctx.build(&emp, &weekday_punches(&w, t(9, 30), t(18, 30))).unwrap();

        assert_eq!(out.span.start, d(12, 15));
        // 15..19 and 22..25 are weekdays, 20 and 21 are the weekend
        assert_eq!(out.summary.presents, 9);
        assert_eq!(out.summary.week_offs, 2);
        assert_eq!(out.raw_payable, dec!(11));
        assert_eq!(out.summary.lops, dec!(0));
        // 11 / 30 * 31 = 11.37 -> 11.4 -> 11.5
        assert_eq!(out.summary.payble_days, dec!(11.5));
    }

    #[test]
    fn employee_outside_cycle_is_skipped() {
        let w = window();
        let calendar = CalendarSnapshot::default();
        let cycle = cycle();
        let ctx = MonthContext { window: &w, cycle: &cycle, calendar: &calendar };
        let mut emp = employee();
        emp.doj = Some(d(12, 26));
        assert!(ctx.build(&emp, &HashMap::new()).is_none());
    }

    #[test]
    fn counts_stay_within_month() {
        let w = window();
        let calendar = CalendarSnapshot::new(weekend_offs(&w), vec![christmas()], vec![casual(d(12, 1), d(12, 3))]);
        let cycle = cycle();
        let ctx = MonthContext { window: &w, cycle: &cycle, calendar: &calendar };
        let emp = employee();
        let out = ctx.build(&emp, &weekday_punches(&w, t(9, 30), t(18, 30))).unwrap();
        let s = &out.summary;

        let covered = Decimal::from(s.presents) + s.half_days + s.cl + s.sl + s.comp_offs
            + Decimal::from(s.week_offs) + Decimal::from(s.holidays) + s.lops;
        assert!(covered <= Decimal::from(s.total_days));
        assert!(out.tally.potential_absents as i64 <= out.span.total_days());
    }

    #[test]
    fn day_views_cover_whole_cycle() {
        let w = window();
        let calendar = CalendarSnapshot::new(weekend_offs(&w), vec![christmas()], vec![]);
        let cycle = cycle();
        let ctx = MonthContext { window: &w, cycle: &cycle, calendar: &calendar };
        let emp = employee();
        let views = ctx.day_views(&emp, &weekday_punches(&w, t(9, 30), t(18, 30)));
        assert_eq!(views.len(), 30);
        assert_eq!(views.last().unwrap().status, "Holiday");
        assert_eq!(views[0].status, "P");
        assert_eq!(views[3].status, "WO");
    }
}
