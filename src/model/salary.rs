use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use super::employee::EmpId;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SalaryStructure {
    pub empid: EmpId,
    pub salary_per_month: Decimal,
    /// Explicit monthly basic; NULL or 0 means "derive from gross".
    pub basic: Option<Decimal>,
    pub pf_check: bool,
    pub esi_check: bool,
}

/// Named empid groups that carry their own basic/HRA rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum PayrollGroup {
    A,
    B,
    C,
}
