use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Employee identifier. Always trimmed; all-digit ids are stored without
/// leading zeros so `"01001"` and `"1001"` name the same person.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(transparent)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "1001")]
pub struct EmpId(String);

impl EmpId {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("empid must not be empty"));
        }
        if trimmed.len() > 32
            || !trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AppError::validation(format!("invalid empid: {trimmed:?}")));
        }

        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            let canonical = trimmed.trim_start_matches('0');
            let canonical = if canonical.is_empty() { "0" } else { canonical };
            return Ok(Self(canonical.to_string()));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Integer form for the tables keyed by a numeric empid (payslips).
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    pub fn require_numeric(&self) -> AppResult<i64> {
        self.as_i64().ok_or_else(|| {
            AppError::validation(format!("empid {} is not numeric", self.0))
        })
    }
}

impl TryFrom<String> for EmpId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EmpId::parse(&value)
    }
}

impl From<EmpId> for String {
    fn from(value: EmpId) -> Self {
        value.0
    }
}

/// Bank identifiers kept on the employee profile. Blank strings are
/// treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BankDetails {
    pub bank_name: Option<String>,
    pub account_no: Option<String>,
    pub ifsc: Option<String>,
    pub pan: Option<String>,
    pub pf_no: Option<String>,
    pub esi_no: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl BankDetails {
    pub fn normalized(&self) -> Self {
        Self {
            bank_name: non_blank(&self.bank_name),
            account_no: non_blank(&self.account_no),
            ifsc: non_blank(&self.ifsc),
            pan: non_blank(&self.pan),
            pf_no: non_blank(&self.pf_no),
            esi_no: non_blank(&self.esi_no),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Employee {
    pub empid: EmpId,
    pub name: String,
    pub role_id: u8,
    pub doj: Option<NaiveDate>,
    pub emp_inactive_date: Option<NaiveDate>,
    pub branch_id: Option<i64>,
    pub company_id: Option<i64>,
    pub department_id: Option<i64>,
    pub manager_empid: Option<EmpId>,
    pub is_late: bool,
    pub is_active: bool,
    pub bank_details: Option<Json<BankDetails>>,
}

impl Employee {
    pub const DEFAULT_BRANCH: i64 = 1;

    /// Branch used for holiday matching; unassigned employees belong to branch 1.
    pub fn branch(&self) -> i64 {
        self.branch_id.unwrap_or(Self::DEFAULT_BRANCH)
    }

    pub fn bank(&self) -> BankDetails {
        self.bank_details
            .as_ref()
            .map(|b| b.0.normalized())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl Employee {
    pub fn sample(empid: &str) -> Self {
        Self {
            empid: EmpId::parse(empid).unwrap(),
            name: format!("Employee {empid}"),
            role_id: 3,
            doj: None,
            emp_inactive_date: None,
            branch_id: None,
            company_id: Some(1),
            department_id: Some(1),
            manager_empid: None,
            is_late: true,
            is_active: true,
            bank_details: None,
        }
    }
}
