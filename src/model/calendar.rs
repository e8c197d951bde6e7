use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;

use super::employee::EmpId;

/// Week-off rows use `"0"` in the empid column to mean every employee.
pub const ALL_EMPLOYEES: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeekOffScope {
    All,
    Employee(EmpId),
}

impl WeekOffScope {
    pub fn from_column(raw: &str) -> Option<Self> {
        if raw.trim() == ALL_EMPLOYEES {
            return Some(WeekOffScope::All);
        }
        EmpId::parse(raw).ok().map(WeekOffScope::Employee)
    }

    pub fn covers(&self, empid: &EmpId) -> bool {
        match self {
            WeekOffScope::All => true,
            WeekOffScope::Employee(id) => id == empid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekOffEntry {
    pub scope: WeekOffScope,
    pub date: NaiveDate,
}

/// Branch ids a holiday applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct HolidayPermissions(pub BTreeSet<i64>);

impl HolidayPermissions {
    pub fn allows(&self, branch_id: i64) -> bool {
        self.0.contains(&branch_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Holiday {
    pub id: u64,
    #[schema(value_type = String, format = "date")]
    pub holiday_date: NaiveDate,
    pub name: String,
    /// NULL in the column means the holiday applies to nobody.
    #[schema(value_type = Option<Vec<i64>>)]
    pub holiday_permissions: Option<Json<HolidayPermissions>>,
}

impl Holiday {
    pub fn applies_to_branch(&self, branch_id: i64) -> bool {
        self.holiday_permissions
            .as_ref()
            .is_some_and(|p| p.0.allows(branch_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_scope_covers_everyone() {
        let scope = WeekOffScope::from_column("0").unwrap();
        assert_eq!(scope, WeekOffScope::All);
        assert!(scope.covers(&EmpId::parse("1001").unwrap()));
    }

    #[test]
    fn employee_scope_covers_only_that_employee() {
        let scope = WeekOffScope::from_column("1001").unwrap();
        assert!(scope.covers(&EmpId::parse("01001").unwrap()));
        assert!(!scope.covers(&EmpId::parse("1002").unwrap()));
    }

    #[test]
    fn holiday_without_permissions_applies_to_nobody() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 25).unwrap();
        let mut holiday = Holiday {
            id: 1,
            holiday_date: date,
            name: "Christmas".into(),
            holiday_permissions: None,
        };
        assert!(!holiday.applies_to_branch(1));

        holiday.holiday_permissions = Some(Json(HolidayPermissions::default()));
        assert!(!holiday.applies_to_branch(1));

        holiday.holiday_permissions = Some(Json(HolidayPermissions([1, 2].into())));
        assert!(holiday.applies_to_branch(2));
        assert!(!holiday.applies_to_branch(3));
    }

    #[test]
    fn permissions_read_as_plain_json_array() {
        let p: HolidayPermissions = serde_json::from_str("[2, 1, 2]").unwrap();
        assert_eq!(p.0.len(), 2);
        assert!(p.allows(1));
    }
}
