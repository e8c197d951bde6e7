use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;

/// Earnings block, keys exactly as stored in the `earnings` column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Earnings {
    #[serde(rename = "GrossSalary")]
    pub gross_salary: Decimal,
    #[serde(rename = "Basic")]
    pub basic: Decimal,
    #[serde(rename = "HRA")]
    pub hra: Decimal,
    #[serde(rename = "CA")]
    pub ca: Decimal,
    #[serde(rename = "MA")]
    pub ma: Decimal,
    #[serde(rename = "SA")]
    pub sa: Decimal,
}

/// Deductions block. `LateLogDeduction` and `LOP` are informational and
/// are not subtracted from net salary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Deductions {
    #[serde(rename = "PF")]
    pub pf: Decimal,
    #[serde(rename = "ESI")]
    pub esi: Decimal,
    #[serde(rename = "PT")]
    pub pt: Decimal,
    #[serde(rename = "TDS")]
    pub tds: Decimal,
    #[serde(rename = "LateLogins")]
    pub late_logins: i32,
    #[serde(rename = "LateLogDeduction")]
    pub late_log_deduction: Decimal,
    #[serde(rename = "LOP")]
    pub lop: Decimal,
    #[serde(rename = "Loan")]
    pub loan: Decimal,
    #[serde(rename = "LWF")]
    pub lwf: Decimal,
}

/// Stored payslip, keyed by (empid, month, year).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Payslip {
    pub empid: i64,
    pub month: u32,
    pub year: i32,
    pub name: String,
    #[schema(value_type = Option<String>, format = "date")]
    pub doj: Option<NaiveDate>,
    pub branch_id: Option<i64>,
    pub department_id: Option<i64>,
    pub total_days: i32,
    pub payable_days: Decimal,
    pub gross_salary: Decimal,
    pub bank_name: Option<String>,
    pub account_no: Option<String>,
    pub ifsc: Option<String>,
    pub pan: Option<String>,
    pub pf_no: Option<String>,
    pub esi_no: Option<String>,
    #[schema(value_type = Earnings)]
    pub earnings: Json<Earnings>,
    #[schema(value_type = Deductions)]
    pub deductions: Json<Deductions>,
    pub earned_gross: Decimal,
    pub net_salary: Decimal,
    pub freaze_status: bool,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub generated_at: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub updated_date: Option<NaiveDateTime>,
    pub updated_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn earnings_use_stored_key_names() {
        let e = Earnings {
            gross_salary: dec!(40000),
            basic: dec!(20000),
            ..Default::default()
        };
        let value = serde_json::to_value(&e).unwrap();
        for key in ["GrossSalary", "Basic", "HRA", "CA", "MA", "SA"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["Basic"], 20000.0);
    }

    #[test]
    fn deductions_use_stored_key_names() {
        let value = serde_json::to_value(Deductions::default()).unwrap();
        for key in ["PF", "ESI", "PT", "TDS", "LateLogins", "LateLogDeduction", "LOP", "Loan", "LWF"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
