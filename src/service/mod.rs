//! Orchestrators. Each one loads inputs through `store`, runs the pure
//! `engine` code and persists the result inside the right transaction.

pub mod attendance;
pub mod leave;
pub mod leave_balance;
pub mod loan;
pub mod notify;
pub mod payroll;
pub mod request;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::model::employee::EmpId;

/// One employee that did not produce a row in a batch run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunIssue {
    #[schema(example = "1001")]
    pub empid: String,
    #[schema(example = "dependency_missing")]
    pub kind: String,
    pub message: String,
}

impl RunIssue {
    pub fn new(empid: &EmpId, error: &AppError) -> Self {
        Self {
            empid: empid.to_string(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Outcome of a batch run over a (month, year) cohort.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunReport {
    #[schema(example = "5b1f3c1e-8a53-4c1e-9d0e-2f9b8d1c7a10")]
    pub run_id: String,
    pub month: u32,
    pub year: i32,
    pub generated: u32,
    pub skipped: Vec<RunIssue>,
    pub errors: Vec<RunIssue>,
    /// Stopped early on a cancel request. Rows already written stay.
    pub cancelled: bool,
}

impl RunReport {
    pub fn new(month: u32, year: i32) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            month,
            year,
            generated: 0,
            skipped: Vec::new(),
            errors: Vec::new(),
            cancelled: false,
        }
    }

    /// Sort a per-employee failure into skipped or errors.
    pub fn record_failure(&mut self, empid: &EmpId, error: &AppError) {
        if error.is_skip() {
            tracing::info!(run_id = %self.run_id, %empid, reason = %error, "Employee skipped");
            self.skipped.push(RunIssue::new(empid, error));
        } else {
            tracing::error!(run_id = %self.run_id, %empid, error = %error, "Employee failed");
            self.errors.push(RunIssue::new(empid, error));
        }
    }

    pub fn skip(&mut self, empid: &EmpId, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::info!(run_id = %self.run_id, %empid, %reason, "Employee skipped");
        self.skipped.push(RunIssue {
            empid: empid.to_string(),
            kind: "skipped".into(),
            message: reason,
        });
    }

    /// A run that touched employees but wrote nothing has failed as a whole.
    pub fn into_result(self, what: &str) -> Result<Self, AppError> {
        if self.generated == 0 && !self.cancelled && !self.errors.is_empty() {
            let first = &self.errors[0];
            return Err(AppError::precondition(format!(
                "no {what} generated for {:02}/{}: {} errors, first for {}: {}",
                self.month,
                self.year,
                self.errors.len(),
                first.empid,
                first.message
            )));
        }
        Ok(self)
    }

    /// Stricter form for attendance builds: any uncancelled run that wrote
    /// nothing has failed, whether employees were skipped or none matched.
    pub fn require_rows(self, what: &str) -> Result<Self, AppError> {
        if self.generated > 0 || self.cancelled {
            return Ok(self);
        }
        let detail = match (self.errors.first(), self.skipped.first()) {
            (Some(first), _) => format!("{} errors, first for {}: {}", self.errors.len(), first.empid, first.message),
            (None, Some(first)) => format!("{} skipped, first {}: {}", self.skipped.len(), first.empid, first.message),
            (None, None) => "no employees in scope".to_string(),
        };
        Err(AppError::precondition(format!(
            "no {what} generated for {:02}/{}: {detail}",
            self.month, self.year
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> EmpId {
        EmpId::parse(raw).unwrap()
    }

    #[test]
    fn failures_are_sorted_by_kind() {
        let mut report = RunReport::new(12, 2025);
        report.record_failure(&id("1001"), &AppError::missing("no salary structure"));
        report.record_failure(&id("1002"), &AppError::internal("deadlock"));
        report.skip(&id("1003"), "payslip is frozen");

        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].kind, "dependency_missing");
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].empid, "1002");
    }

    #[test]
    fn zero_rows_with_errors_fails_the_run() {
        let mut report = RunReport::new(12, 2025);
        report.record_failure(&id("1001"), &AppError::internal("deadlock"));
        assert!(matches!(report.into_result("payslips"), Err(AppError::PreconditionFailed(_))));
    }

    #[test]
    fn partial_success_is_reported_not_failed() {
        let mut report = RunReport::new(12, 2025);
        report.generated = 1;
        report.record_failure(&id("1001"), &AppError::internal("deadlock"));
        let report = report.into_result("payslips").unwrap();
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn payroll_with_only_skips_is_reported() {
        let mut report = RunReport::new(12, 2025);
        report.record_failure(&id("1001"), &AppError::missing("no summary"));
        assert!(report.into_result("payslips").is_ok());
    }

    #[test]
    fn attendance_build_with_no_rows_fails() {
        let empty = RunReport::new(12, 2025);
        assert!(matches!(empty.require_rows("attendance rows"), Err(AppError::PreconditionFailed(_))));

        let mut skipped = RunReport::new(12, 2025);
        skipped.skip(&id("1001"), "not in service during the cycle");
        let err = skipped.require_rows("attendance rows").unwrap_err();
        assert!(err.to_string().contains("not in service"));
    }

    #[test]
    fn attendance_build_with_rows_or_cancelled_succeeds() {
        let mut built = RunReport::new(12, 2025);
        built.generated = 3;
        built.skip(&id("1001"), "not in service during the cycle");
        assert_eq!(built.require_rows("attendance rows").unwrap().generated, 3);

        let mut cancelled = RunReport::new(12, 2025);
        cancelled.cancelled = true;
        assert!(cancelled.require_rows("attendance rows").is_ok());
    }
}
