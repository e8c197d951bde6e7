use rust_decimal::Decimal;

use crate::error::{AppError, AppResult};
use crate::model::employee::{BankDetails, Employee};
use crate::model::salary::SalaryStructure;

/// Salary inputs a payslip is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSalary {
    pub monthly_gross: Decimal,
    /// Zero when no explicit basic is configured.
    pub basic_override: Decimal,
    pub pf_check: bool,
    pub esi_check: bool,
    pub bank: BankDetails,
}

pub fn resolve(employee: &Employee, structure: Option<&SalaryStructure>) -> AppResult<ResolvedSalary> {
    let structure = structure.ok_or_else(|| {
        AppError::missing(format!("no salary structure for employee {}", employee.empid))
    })?;

    if structure.salary_per_month <= Decimal::ZERO {
        return Err(AppError::missing(format!(
            "salary_per_month is not positive for employee {}",
            employee.empid
        )));
    }

    Ok(ResolvedSalary {
        monthly_gross: structure.salary_per_month,
        basic_override: structure.basic.filter(|b| *b > Decimal::ZERO).unwrap_or(Decimal::ZERO),
        pf_check: structure.pf_check,
        esi_check: structure.esi_check,
        bank: employee.bank(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn structure(gross: Decimal, basic: Option<Decimal>) -> SalaryStructure {
        SalaryStructure {
            empid: crate::model::employee::EmpId::parse("1001").unwrap(),
            salary_per_month: gross,
            basic,
            pf_check: true,
            esi_check: false,
        }
    }

    #[test]
    fn missing_structure_is_a_skip() {
        let err = resolve(&Employee::sample("1001"), None).unwrap_err();
        assert!(err.is_skip());
    }

    #[test]
    fn non_positive_gross_is_a_skip() {
        let s = structure(dec!(0), None);
        assert!(resolve(&Employee::sample("1001"), Some(&s)).unwrap_err().is_skip());
    }

    #[test]
    fn negative_or_missing_basic_means_no_override() {
        let e = Employee::sample("1001");
        let r = resolve(&e, Some(&structure(dec!(30000), None))).unwrap();
        assert_eq!(r.basic_override, dec!(0));
        let r = resolve(&e, Some(&structure(dec!(30000), Some(dec!(-5))))).unwrap();
        assert_eq!(r.basic_override, dec!(0));
        let r = resolve(&e, Some(&structure(dec!(30000), Some(dec!(18000))))).unwrap();
        assert_eq!(r.basic_override, dec!(18000));
        assert!(r.pf_check);
    }
}
