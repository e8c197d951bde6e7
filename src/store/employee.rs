use chrono::NaiveDate;
use sqlx::{Executor, MySql};

use crate::error::{AppError, AppResult};
use crate::model::employee::{EmpId, Employee};

const COLUMNS: &str = r#"
    empid, name, role_id, doj, emp_inactive_date, branch_id, company_id,
    department_id, manager_empid, is_late, is_active, bank_details
"#;

/// Payroll cohort. Built from the most specific filter a caller gave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cohort {
    Employee(EmpId),
    Department(i64),
    Branch(i64),
    Company(i64),
    Everyone,
}

impl Cohort {
    pub fn most_specific(
        empid: Option<EmpId>,
        department_id: Option<i64>,
        branch_id: Option<i64>,
        company_id: Option<i64>,
    ) -> Self {
        match (empid, department_id, branch_id, company_id) {
            (Some(e), ..) => Cohort::Employee(e),
            (None, Some(d), ..) => Cohort::Department(d),
            (None, None, Some(b), _) => Cohort::Branch(b),
            (None, None, None, Some(c)) => Cohort::Company(c),
            (None, None, None, None) => Cohort::Everyone,
        }
    }
}

/// Whose rows an employee-owned listing may return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Visibility {
    pub empid: Option<EmpId>,
    /// Restricts rows to this manager and their direct reports.
    pub team_of: Option<EmpId>,
}

impl Visibility {
    pub fn only(empid: EmpId) -> Self {
        Self {
            empid: Some(empid),
            team_of: None,
        }
    }

    /// Predicates for the table's `empid` column, appended after a WHERE.
    pub fn where_sql(&self) -> String {
        let mut sql = String::new();
        if self.empid.is_some() {
            sql.push_str(" AND empid = ?");
        }
        if self.team_of.is_some() {
            sql.push_str(" AND (empid = ? OR empid IN (SELECT e.empid FROM employees e WHERE e.manager_empid = ?))");
        }
        sql
    }

    /// Values for the placeholders of `where_sql`, in order.
    pub fn binds(&self) -> Vec<&EmpId> {
        let mut binds: Vec<&EmpId> = self.empid.iter().collect();
        if let Some(manager) = &self.team_of {
            binds.extend([manager, manager]);
        }
        binds
    }

    /// Same rule as `where_sql`, for a row already loaded.
    pub fn admits(&self, owner: &EmpId, owner_manager: Option<&EmpId>) -> bool {
        let single = self.empid.as_ref().is_none_or(|e| e == owner);
        let team = self
            .team_of
            .as_ref()
            .is_none_or(|m| m == owner || owner_manager == Some(m));
        single && team
    }
}

pub async fn find<'e, E>(exec: E, empid: &EmpId) -> AppResult<Option<Employee>>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {COLUMNS} FROM employees WHERE empid = ?");
    Ok(sqlx::query_as::<_, Employee>(&sql)
        .bind(empid)
        .fetch_optional(exec)
        .await?)
}

/// Like `find`, but an unknown empid is the caller's mistake.
pub async fn require<'e, E>(exec: E, empid: &EmpId) -> AppResult<Employee>
where
    E: Executor<'e, Database = MySql>,
{
    find(exec, empid)
        .await?
        .ok_or_else(|| AppError::validation(format!("unknown empid {empid}")))
}

/// Lock the employee row; serializes writers acting for one employee.
pub async fn lock<'e, E>(exec: E, empid: &EmpId) -> AppResult<Employee>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {COLUMNS} FROM employees WHERE empid = ? FOR UPDATE");
    sqlx::query_as::<_, Employee>(&sql)
        .bind(empid)
        .fetch_optional(exec)
        .await?
        .ok_or_else(|| AppError::validation(format!("unknown empid {empid}")))
}

/// Employees whose service overlaps `[first, last]`.
pub async fn in_service_between<'e, E>(
    exec: E,
    first: NaiveDate,
    last: NaiveDate,
    only: Option<&EmpId>,
) -> AppResult<Vec<Employee>>
where
    E: Executor<'e, Database = MySql>,
{
    let mut sql = format!(
        r#"
        SELECT {COLUMNS} FROM employees
        WHERE (doj IS NULL OR doj <= ?)
          AND (emp_inactive_date IS NULL OR emp_inactive_date >= ?)
        "#
    );
    if only.is_some() {
        sql.push_str(" AND empid = ?");
    }
    sql.push_str(" ORDER BY empid");

    let mut query = sqlx::query_as::<_, Employee>(&sql).bind(last).bind(first);
    if let Some(empid) = only {
        query = query.bind(empid);
    }
    Ok(query.fetch_all(exec).await?)
}

pub async fn in_cohort<'e, E>(exec: E, cohort: &Cohort) -> AppResult<Vec<Employee>>
where
    E: Executor<'e, Database = MySql>,
{
    let filter = match cohort {
        Cohort::Employee(_) => " WHERE empid = ?",
        Cohort::Department(_) => " WHERE department_id = ?",
        Cohort::Branch(_) => " WHERE branch_id = ?",
        Cohort::Company(_) => " WHERE company_id = ?",
        Cohort::Everyone => "",
    };
    let sql = format!("SELECT {COLUMNS} FROM employees{filter} ORDER BY empid");

    let query = sqlx::query_as::<_, Employee>(&sql);
    let query = match cohort {
        Cohort::Employee(empid) => query.bind(empid.clone()),
        Cohort::Department(id) | Cohort::Branch(id) | Cohort::Company(id) => query.bind(*id),
        Cohort::Everyone => query,
    };
    Ok(query.fetch_all(exec).await?)
}

pub async fn all_active<'e, E>(exec: E) -> AppResult<Vec<Employee>>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {COLUMNS} FROM employees WHERE is_active = TRUE ORDER BY empid");
    Ok(sqlx::query_as::<_, Employee>(&sql).fetch_all(exec).await?)
}
