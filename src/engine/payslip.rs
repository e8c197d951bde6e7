//! Earnings and statutory deductions for one employee-month.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::engine::rounding::{round0, round2};
use crate::engine::salary::ResolvedSalary;
use crate::model::attendance::AttendanceSummary;
use crate::model::payslip::{Deductions, Earnings};
use crate::model::salary::PayrollGroup;

const PF_CAP: Decimal = dec!(1800);
const PF_BASIC_CEILING: Decimal = dec!(15000);
const ESI_GROSS_CEILING: Decimal = dec!(21000);
const MA_MONTHLY: Decimal = dec!(1250);
const CA_MONTHLY: Decimal = dec!(1600);
const ALLOWANCE_GROSS_FLOOR: Decimal = dec!(25001);
const LWF_DECEMBER: Decimal = dec!(2);

/// Attendance figures the calculator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayableDays {
    pub month: u32,
    pub total_days: i32,
    pub payable_days: Decimal,
    pub late_logs: i32,
    pub lops: Decimal,
}

impl From<&AttendanceSummary> for PayableDays {
    fn from(s: &AttendanceSummary) -> Self {
        Self {
            month: s.month,
            total_days: s.total_days,
            payable_days: s.payble_days,
            late_logs: s.late_logs,
            lops: s.lops,
        }
    }
}

/// Result of the calculator before loan recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayslipDraft {
    pub earnings: Earnings,
    pub deductions: Deductions,
    pub per_day_gross: Decimal,
    pub earned_gross: Decimal,
    pub total_earnings: Decimal,
    pub net_before_loan: Decimal,
}

fn monthly_basic_base(gross: Decimal, group: Option<PayrollGroup>) -> Decimal {
    match group {
        Some(PayrollGroup::A | PayrollGroup::B | PayrollGroup::C) => dec!(15000),
        None if gross < dec!(20000) => dec!(13500),
        None if gross <= dec!(30000) => dec!(15000),
        None => round2(gross * dec!(0.50)),
    }
}

fn hra_rate(gross: Decimal, group: Option<PayrollGroup>) -> Decimal {
    match group {
        Some(PayrollGroup::A | PayrollGroup::B) => {
            if gross > dec!(30001) {
                dec!(0.50)
            } else if gross <= dec!(21001) {
                dec!(0.15)
            } else {
                dec!(0.10)
            }
        }
        Some(PayrollGroup::C) => {
            if gross > dec!(30001) { dec!(0.50) } else { dec!(0.10) }
        }
        None if gross <= dec!(20000) => {
            if gross <= dec!(21001) { dec!(0.15) } else { dec!(0.10) }
        }
        None => {
            if gross > dec!(30001) {
                dec!(0.50)
            } else if gross <= dec!(21001) {
                dec!(0.40)
            } else {
                dec!(0.30)
            }
        }
    }
}

fn professional_tax(earned_gross: Decimal) -> Decimal {
    if earned_gross <= dec!(15000) {
        Decimal::ZERO
    } else if earned_gross <= dec!(20000) {
        dec!(150)
    } else {
        dec!(200)
    }
}

/// Compute the payslip for one month. `annual_tds` is spread evenly over
/// twelve months.
pub fn calculate(
    days: PayableDays,
    salary: &ResolvedSalary,
    group: Option<PayrollGroup>,
    annual_tds: Decimal,
) -> PayslipDraft {
    let total_days = Decimal::from(days.total_days.max(1));
    let payable_days = days.payable_days.max(Decimal::ZERO);
    let gross = salary.monthly_gross;
    let prorate = |monthly: Decimal| round0(monthly / total_days * payable_days);

    let per_day_gross = round2(gross / total_days);
    let earned_gross = prorate(gross);

    let basic_base = if salary.basic_override > Decimal::ZERO {
        salary.basic_override
    } else {
        monthly_basic_base(gross, group)
    };
    let basic = prorate(basic_base);
    let hra = prorate(basic * hra_rate(gross, group));

    let (ma, ca) = if gross > ALLOWANCE_GROSS_FLOOR {
        (prorate(MA_MONTHLY), prorate(CA_MONTHLY))
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };
    let sa = round0(earned_gross - (basic + hra + ma + ca));

    let pf = match (salary.pf_check, basic >= PF_BASIC_CEILING) {
        (false, _) => Decimal::ZERO,
        (true, true) => PF_CAP,
        (true, false) => round0(basic * dec!(0.12)).min(PF_CAP),
    };
    let esi = if salary.esi_check && gross <= ESI_GROSS_CEILING {
        round0(earned_gross * dec!(0.0075))
    } else {
        Decimal::ZERO
    };
    let pt = professional_tax(earned_gross);
    let tds = round0(annual_tds / dec!(12));
    let lwf = if days.month == 12 { LWF_DECEMBER } else { Decimal::ZERO };

    // informational only, payable days already carry these
    let late_log_deduction = round0(Decimal::from(days.late_logs) * per_day_gross);
    let lop = round0(days.lops * per_day_gross);

    let total_earnings = round0(basic + hra + ma + ca + sa);
    let net_before_loan = round0(total_earnings - (pf + esi + pt + tds + lwf));

    PayslipDraft {
        earnings: Earnings {
            gross_salary: gross,
            basic,
            hra,
            ca,
            ma,
            sa,
        },
        deductions: Deductions {
            pf,
            esi,
            pt,
            tds,
            late_logins: days.late_logs,
            late_log_deduction,
            lop,
            loan: Decimal::ZERO,
            lwf,
        },
        per_day_gross,
        earned_gross,
        total_earnings,
        net_before_loan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::BankDetails;

    fn salary(gross: Decimal, basic: Decimal, pf: bool, esi: bool) -> ResolvedSalary {
        ResolvedSalary {
            monthly_gross: gross,
            basic_override: basic,
            pf_check: pf,
            esi_check: esi,
            bank: BankDetails::default(),
        }
    }

    fn full_month(month: u32) -> PayableDays {
        PayableDays {
            month,
            total_days: 31,
            payable_days: dec!(31),
            late_logs: 0,
            lops: dec!(0),
        }
    }

    #[test]
    fn basic_override_full_month() {
        let draft = calculate(full_month(11), &salary(dec!(40000), dec!(20000), true, true), None, dec!(0));
        let e = &draft.earnings;
        assert_eq!(draft.earned_gross, dec!(40000));
        assert_eq!(e.basic, dec!(20000));
        assert_eq!(e.hra, dec!(10000));
        assert_eq!(e.ma, dec!(1250));
        assert_eq!(e.ca, dec!(1600));
        assert_eq!(e.sa, dec!(7150));
        assert_eq!(draft.deductions.pf, dec!(1800));
        assert_eq!(draft.deductions.esi, dec!(0));
        assert_eq!(draft.deductions.pt, dec!(200));
        assert_eq!(draft.deductions.lwf, dec!(0));
        assert_eq!(draft.total_earnings, dec!(40000));
        assert_eq!(draft.net_before_loan, dec!(38000));
    }

    #[test]
    fn december_charges_lwf() {
        let draft = calculate(full_month(12), &salary(dec!(40000), dec!(20000), true, true), None, dec!(0));
        assert_eq!(draft.deductions.lwf, dec!(2));
        assert_eq!(draft.net_before_loan, dec!(37998));
    }

    #[test]
    fn low_gross_default_rules() {
        // 18000 gross, no group: basic 13500, HRA 15%, no MA/CA, ESI applies
        let draft = calculate(full_month(11), &salary(dec!(18000), dec!(0), true, true), None, dec!(0));
        let e = &draft.earnings;
        assert_eq!(e.basic, dec!(13500));
        assert_eq!(e.hra, dec!(2025));
        assert_eq!(e.ma, dec!(0));
        assert_eq!(e.ca, dec!(0));
        assert_eq!(e.sa, dec!(2475));
        assert_eq!(draft.deductions.pf, dec!(1620));
        assert_eq!(draft.deductions.esi, dec!(135));
        assert_eq!(draft.deductions.pt, dec!(150));
        assert_eq!(draft.net_before_loan, dec!(16095));
    }

    #[test]
    fn mid_gross_default_rules() {
        // 25000: basic 15000, HRA 30%, MA/CA need gross above 25001
        let draft = calculate(full_month(11), &salary(dec!(25000), dec!(0), true, false), None, dec!(0));
        assert_eq!(draft.earnings.basic, dec!(15000));
        assert_eq!(draft.earnings.hra, dec!(4500));
        assert_eq!(draft.earnings.ma, dec!(0));
        assert_eq!(draft.deductions.pf, dec!(1800));
    }

    #[test]
    fn high_gross_default_basic_is_half() {
        let draft = calculate(full_month(11), &salary(dec!(50000), dec!(0), false, false), None, dec!(0));
        assert_eq!(draft.earnings.basic, dec!(25000));
        assert_eq!(draft.earnings.hra, dec!(12500));
        assert_eq!(draft.deductions.pf, dec!(0));
    }

    #[test]
    fn group_rules() {
        let s = salary(dec!(26000), dec!(0), true, false);
        let a = calculate(full_month(11), &s, Some(PayrollGroup::A), dec!(0));
        assert_eq!(a.earnings.basic, dec!(15000));
        assert_eq!(a.earnings.hra, dec!(1500));

        let s = salary(dec!(21000), dec!(0), true, false);
        let b = calculate(full_month(11), &s, Some(PayrollGroup::B), dec!(0));
        assert_eq!(b.earnings.hra, dec!(2250));

        let c = calculate(full_month(11), &s, Some(PayrollGroup::C), dec!(0));
        assert_eq!(c.earnings.basic, dec!(15000));
        assert_eq!(c.earnings.hra, dec!(1500));

        let s = salary(dec!(40000), dec!(0), true, false);
        let c = calculate(full_month(11), &s, Some(PayrollGroup::C), dec!(0));
        assert_eq!(c.earnings.hra, dec!(7500));
    }

    #[test]
    fn proration_and_informational_deductions() {
        let days = PayableDays {
            month: 11,
            total_days: 30,
            payable_days: dec!(27.5),
            late_logs: 4,
            lops: dec!(2.5),
        };
        let draft = calculate(days, &salary(dec!(30000), dec!(0), true, true), None, dec!(0));
        assert_eq!(draft.per_day_gross, dec!(1000));
        assert_eq!(draft.earned_gross, dec!(27500));
        assert_eq!(draft.earnings.basic, dec!(13750));
        assert_eq!(draft.deductions.late_logins, 4);
        assert_eq!(draft.deductions.late_log_deduction, dec!(4000));
        assert_eq!(draft.deductions.lop, dec!(2500));
        // ESI ceiling is on monthly gross, 30000 is above it
        assert_eq!(draft.deductions.esi, dec!(0));

        let sum = draft.earnings.basic + draft.earnings.hra + draft.earnings.ma + draft.earnings.ca + draft.earnings.sa;
        assert_eq!(draft.total_earnings, sum);
        let statutory = draft.deductions.pf + draft.deductions.esi + draft.deductions.pt + draft.deductions.tds + draft.deductions.lwf;
        assert_eq!(draft.net_before_loan, draft.total_earnings - statutory);
    }

    #[test]
    fn tds_is_a_twelfth_of_annual() {
        let draft = calculate(full_month(11), &salary(dec!(40000), dec!(20000), true, false), None, dec!(12006));
        assert_eq!(draft.deductions.tds, dec!(1001));
        assert_eq!(draft.net_before_loan, dec!(36999));
    }

    #[test]
    fn degenerate_days_are_guarded() {
        let days = PayableDays {
            month: 11,
            total_days: 0,
            payable_days: dec!(-3),
            late_logs: 0,
            lops: dec!(0),
        };
        let draft = calculate(days, &salary(dec!(30000), dec!(0), true, true), None, dec!(0));
        assert_eq!(draft.earned_gross, dec!(0));
        assert_eq!(draft.earnings.basic, dec!(0));
        assert_eq!(draft.net_before_loan, dec!(0));
    }
}
