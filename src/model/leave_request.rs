use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use super::employee::EmpId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LeaveType {
    Casual,
    Sick,
    CompOff,
    Lop,
    Other,
}

impl LeaveType {
    /// Leaves that count toward payable days.
    pub fn is_paid(self) -> bool {
        matches!(self, LeaveType::Casual | LeaveType::Sick | LeaveType::CompOff)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    pub id: u64,
    pub empid: EmpId,
    #[schema(value_type = String, format = "date")]
    pub from_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to_date: NaiveDate,
    pub leave_type: LeaveType,
    pub status: ApprovalStatus,
    pub duration: Decimal,
    /// First day is only a half day.
    pub half_from: bool,
    /// Last day is only a half day.
    pub half_to: bool,
    pub reason: Option<String>,
    pub decided_by: Option<EmpId>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.from_date <= date && date <= self.to_date
    }

    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.from_date <= to && from <= self.to_date
    }

    /// Portion of `date` taken as leave: 0.5 on a half-marked endpoint, else 1.
    pub fn share_on(&self, date: NaiveDate) -> Decimal {
        let half = (self.half_from && date == self.from_date) || (self.half_to && date == self.to_date);
        if half { Decimal::new(5, 1) } else { Decimal::ONE }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, day).unwrap()
    }

    fn leave(from: u32, to: u32) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            empid: EmpId::parse("1001").unwrap(),
            from_date: d(from),
            to_date: d(to),
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
    fn leave_type_wire_names() {
        assert_eq!(LeaveType::from_str("comp-off").unwrap(), LeaveType::CompOff);
        assert_eq!(LeaveType::CompOff.to_string(), "comp-off");
        assert_eq!(
            serde_json::to_string(&LeaveType::Lop).unwrap(),
            "\"lop\""
        );
    }

    #[test]
    fn only_casual_sick_and_comp_off_are_paid() {
        assert!(LeaveType::Casual.is_paid());
        assert!(LeaveType::CompOff.is_paid());
        assert!(!LeaveType::Lop.is_paid());
        assert!(!LeaveType::Other.is_paid());
    }

    #[test]
    fn overlap_is_inclusive() {
        let l = leave(10, 12);
        assert!(l.overlaps(d(12), d(14)));
        assert!(l.overlaps(d(1), d(10)));
        assert!(!l.overlaps(d(13), d(14)));
        assert!(l.covers(d(11)));
    }

    #[test]
    fn half_markers_halve_endpoints() {
        let mut l = leave(10, 12);
        l.half_from = true;
        assert_eq!(l.share_on(d(10)), dec!(0.5));
        assert_eq!(l.share_on(d(11)), dec!(1));
        assert_eq!(l.share_on(d(12)), dec!(1));
    }
}
