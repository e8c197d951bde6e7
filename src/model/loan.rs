use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use super::employee::EmpId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum StageStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// One approval stage of a loan (manager, hr, accounts).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApprovalBag {
    pub status: StageStatus,
    pub approver_name: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approver_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LoanStage {
    Manager,
    Hr,
    Accounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LoanStatus {
    Applied,
    Approved,
    Rejected,
    Active,
    Cleared,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeLoan {
    pub loan_id: u64,
    pub empid: EmpId,
    pub loan_amount: Decimal,
    pub tenure_months: u32,
    #[schema(value_type = ApprovalBag)]
    pub manager: Json<ApprovalBag>,
    #[schema(value_type = ApprovalBag)]
    pub hr: Json<ApprovalBag>,
    #[schema(value_type = ApprovalBag)]
    pub accounts: Json<ApprovalBag>,
    pub status: LoanStatus,
}

impl EmployeeLoan {
    pub fn stage(&self, stage: LoanStage) -> &ApprovalBag {
        match stage {
            LoanStage::Manager => &self.manager.0,
            LoanStage::Hr => &self.hr.0,
            LoanStage::Accounts => &self.accounts.0,
        }
    }

    pub fn stage_mut(&mut self, stage: LoanStage) -> &mut ApprovalBag {
        match stage {
            LoanStage::Manager => &mut self.manager.0,
            LoanStage::Hr => &mut self.hr.0,
            LoanStage::Accounts => &mut self.accounts.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum InstallmentStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "Success")]
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Installment {
    pub installment_number: u32,
    #[schema(value_type = String, format = "date")]
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub status: InstallmentStatus,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub paid_date: Option<NaiveDateTime>,
}

impl Installment {
    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Success
    }

    pub fn due_in(&self, month: u32, year: i32) -> bool {
        self.due_date.month() == month && self.due_date.year() == year
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LoanInstallments {
    pub loan_id: u64,
    pub empid: EmpId,
    #[schema(value_type = Vec<Installment>)]
    pub installments: Json<Vec<Installment>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn installment_json_shape() {
        let inst = Installment {
            installment_number: 2,
            due_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            amount: dec!(5000),
            status: InstallmentStatus::Pending,
            paid_date: None,
        };
        let value = serde_json::to_value(&inst).unwrap();
        assert_eq!(value["due_date"], "2025-12-01");
        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["amount"], 5000.0);
        assert!(value["paid_date"].is_null());

        let back: Installment = serde_json::from_value(value).unwrap();
        assert_eq!(back, inst);
    }

    #[test]
    fn paid_status_is_spelled_success() {
        let s: InstallmentStatus = serde_json::from_str("\"Success\"").unwrap();
        assert_eq!(s, InstallmentStatus::Success);
    }

    #[test]
    fn due_month_match() {
        let inst = Installment {
            installment_number: 1,
            due_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            amount: dec!(1),
            status: InstallmentStatus::Pending,
            paid_date: None,
        };
        assert!(inst.due_in(1, 2026));
        assert!(!inst.due_in(1, 2025));
        assert!(!inst.due_in(12, 2025));
    }
}
