use chrono::{Duration, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::model::employee::EmpId;
use crate::model::leave_balance::LeaveBalance;

pub const YEARLY_CASUAL: Decimal = dec!(12);
pub const YEARLY_SICK: Decimal = dec!(12);

/// Opening balance for `year`, prorated by the month it is generated in:
/// generating in March leaves 10 of 12 casual and sick days.
pub fn project_year(empid: EmpId, year: i32, current_month: u32) -> LeaveBalance {
    let remaining = Decimal::from(12 - current_month.clamp(1, 12) + 1);
    LeaveBalance {
        total_casual: YEARLY_CASUAL,
        used_casual: YEARLY_CASUAL - remaining,
        balance_casual: remaining,
        total_sick: YEARLY_SICK,
        used_sick: YEARLY_SICK - remaining,
        balance_sick: remaining,
        ..LeaveBalance::zero(empid, year)
    }
}

fn grant_for(worked: Duration) -> Decimal {
    let hours = Decimal::from(worked.num_seconds()) / dec!(3600);
    if hours >= dec!(8) {
        dec!(1.0)
    } else if hours >= dec!(4) {
        dec!(0.5)
    } else {
        Decimal::ZERO
    }
}

/// Comp-off earned for an approved overtime day.
pub fn comp_off_grant(in_time: NaiveTime, out_time: NaiveTime) -> Decimal {
    grant_for(out_time - in_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn january_generation_grants_full_year() {
        let row = project_year(EmpId::parse("1001").unwrap(), 2026, 1);
        assert_eq!(row.balance_casual, dec!(12));
        assert_eq!(row.used_casual, dec!(0));
        assert_eq!(row.total_comp_off, dec!(0));
        assert!(row.is_consistent());
    }

    #[test]
    fn later_generation_prorates() {
        let row = project_year(EmpId::parse("1001").unwrap(), 2025, 10);
        assert_eq!(row.balance_casual, dec!(3));
        assert_eq!(row.used_casual, dec!(9));
        assert_eq!(row.balance_sick, dec!(3));
        assert_eq!(row.used_sick, dec!(9));
        assert!(row.is_consistent());

        let december = project_year(EmpId::parse("1001").unwrap(), 2025, 12);
        assert_eq!(december.balance_casual, dec!(1));
    }

    #[test]
    fn comp_off_thresholds() {
        assert_eq!(comp_off_grant(t(9, 0), t(17, 0)), dec!(1));
        assert_eq!(comp_off_grant(t(9, 0), t(16, 59)), dec!(0.5));
        assert_eq!(comp_off_grant(t(9, 0), t(13, 0)), dec!(0.5));
        assert_eq!(comp_off_grant(t(9, 0), t(12, 59)), dec!(0));
        assert_eq!(comp_off_grant(t(17, 0), t(9, 0)), dec!(0));
    }

    #[test]
    fn grant_accumulates_on_row() {
        let mut row = project_year(EmpId::parse("1001").unwrap(), 2025, 6);
        row.grant_comp_off(comp_off_grant(t(9, 0), t(18, 0)));
        row.grant_comp_off(comp_off_grant(t(9, 0), t(14, 0)));
        assert_eq!(row.total_comp_off, dec!(1.5));
        assert_eq!(row.balance_comp_off, dec!(1.5));
        assert!(row.is_consistent());
    }
}
