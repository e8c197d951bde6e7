use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::engine::calendar::{CalendarSnapshot, LeaveDay, ServiceSpan};
use crate::engine::punch::PunchPair;
use crate::model::attendance::AttendanceCycle;
use crate::model::employee::Employee;

/// Outcome for one (employee, date). Exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    OutOfService,
    WeekOff,
    Holiday,
    Leave(LeaveDay),
    Present { late: bool },
    HalfDay { late: bool },
    Absent,
}

impl DayStatus {
    /// Short code shown on attendance sheets.
    pub fn token(&self) -> String {
        match self {
            DayStatus::OutOfService => "-".into(),
            DayStatus::WeekOff => "WO".into(),
            DayStatus::Holiday => "Holiday".into(),
            DayStatus::Leave(day) => day.leave_type.to_string(),
            DayStatus::Present { .. } => "P".into(),
            DayStatus::HalfDay { .. } => "H/D".into(),
            DayStatus::Absent => "Abs".into(),
        }
    }

    pub fn is_late(&self) -> bool {
        matches!(self, DayStatus::Present { late: true } | DayStatus::HalfDay { late: true })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DayView {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "P")]
    pub status: String,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub in_time: Option<chrono::NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub out_time: Option<chrono::NaiveDateTime>,
}

/// Everything the classifier needs that does not change per day.
pub struct DayClassifier<'a> {
    pub employee: &'a Employee,
    pub span: Option<ServiceSpan>,
    pub calendar: &'a CalendarSnapshot,
    pub cycle: &'a AttendanceCycle,
}

impl<'a> DayClassifier<'a> {
    /// Precedence: out of service, week-off, holiday, leave, then punches.
    pub fn classify(&self, date: NaiveDate, punches: &PunchPair) -> DayStatus {
        if !self.span.is_some_and(|s| s.contains(date)) {
            return DayStatus::OutOfService;
        }
        let empid = &self.employee.empid;
        if self.calendar.is_week_off(empid, date) {
            return DayStatus::WeekOff;
        }
        if self.calendar.is_holiday(self.employee, date) {
            return DayStatus::Holiday;
        }
        if let Some(leave) = self.calendar.leave_on(empid, date) {
            return DayStatus::Leave(leave);
        }

        let worked = punches.worked();
        let late = punches
            .in_time
            .is_some_and(|t| t.time() > self.cycle.late_log_time);

        if worked >= self.cycle.full_day() {
            DayStatus::Present { late }
        } else if worked >= self.cycle.half_day() && worked > chrono::Duration::zero() {
            DayStatus::HalfDay { late }
        } else {
            DayStatus::Absent
        }
    }

    pub fn view(&self, date: NaiveDate, punches: &PunchPair) -> DayView {
        DayView {
            date,
            status: self.classify(date, punches).token(),
            in_time: punches.in_time,
            out_time: punches.out_time,
        }
    }
}
