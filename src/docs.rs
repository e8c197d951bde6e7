use crate::api::attendance::{
    BuildReq, CancelResponse, DaysQuery, PaginatedSummaryResponse, PunchReq, PunchResponse, SummaryQuery,
};
use crate::api::leave_balance::{BalancePage, BalanceQuery, GenerateBalances};
use crate::api::leave_request::{ApplyLeave, CreatedResponse, LeaveQuery, PaginatedLeaveResponse};
use crate::api::loan::{ActivatedLoan, ApplyLoan, LoanPage, LoanQuery, StageDecision};
use crate::api::payroll::{BackfillResponse, GeneratePayroll, GroupReq, PaginatedPayslipResponse, PayslipQuery};
use crate::api::request::{Decision, RequestPage, RequestQuery, SubmitRequest};
use crate::api::{CycleRef, PageQuery};
use crate::auth::handlers::MeResponse;
use crate::engine::classifier::DayView;
use crate::model::attendance::{AttendanceCycle, AttendanceSummary, DayRecord, PunchKind};
use crate::model::employee::{BankDetails, EmpId};
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::{ApprovalStatus, LeaveRequest, LeaveType};
use crate::model::loan::{ApprovalBag, EmployeeLoan, Installment, InstallmentStatus, LoanInstallments, LoanStage, LoanStatus, StageStatus};
use crate::model::payslip::{Deductions, Earnings, Payslip};
use crate::model::request::{AttendanceRequest, RequestType};
use crate::model::salary::PayrollGroup;
use crate::models::{LoginReqDto, RegisterReq, TokenPair};
use crate::service::leave_balance::BalanceRun;
use crate::service::payroll::FreezeOutcome;
use crate::service::{RunIssue, RunReport};
use crate::utils::run_flags::RunKind;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Attendance & Payroll API",
        version = "1.0.0",
        description = r#"
## Attendance and payroll back office

Turns raw punches into monthly attendance summaries and those into payslips.

### Key Features
- **Attendance**: punches, day reconciliation, cycle configuration, monthly builds
- **Requests**: in/out corrections and overtime comp-off
- **Leave**: applications, approvals, yearly balances
- **Payroll**: payslip runs, freeze/unfreeze, bank backfill, payroll groups
- **Loans**: three-stage approval and installment recovery through payroll

### Security
Every `/api` endpoint needs a **JWT Bearer** access token. What a caller may do
is decided by the capabilities mapped to their role.

### Batch runs
Attendance builds and payroll runs hold a per-cycle lock, can be cancelled
and return a run report listing generated, skipped and failed employees.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::attendance::punch,
        crate::api::attendance::build,
        crate::api::attendance::cancel_build,
        crate::api::attendance::get_cycle,
        crate::api::attendance::put_cycle,
        crate::api::attendance::list_summaries,
        crate::api::attendance::list_days,

        crate::api::request::submit,
        crate::api::request::list,
        crate::api::request::decide,

        crate::api::leave_request::apply,
        crate::api::leave_request::list,
        crate::api::leave_request::get,
        crate::api::leave_request::approve,
        crate::api::leave_request::reject,

        crate::api::leave_balance::generate,
        crate::api::leave_balance::list,

        crate::api::payroll::generate,
        crate::api::payroll::cancel_generate,
        crate::api::payroll::toggle_freeze,
        crate::api::payroll::list_payslips,
        crate::api::payroll::get_payslip,
        crate::api::payroll::backfill_bank,
        crate::api::payroll::set_group,

        crate::api::loan::apply,
        crate::api::loan::list,
        crate::api::loan::installments,
        crate::api::loan::decide_stage,
        crate::api::loan::activate
    ),
    components(
        schemas(
            RegisterReq, LoginReqDto, TokenPair, MeResponse,
            EmpId, BankDetails, PageQuery, CycleRef,
            PunchKind, PunchReq, PunchResponse, DayRecord, DayView,
            AttendanceCycle, AttendanceSummary, BuildReq, CancelResponse, RunKind,
            SummaryQuery, DaysQuery, PaginatedSummaryResponse,
            RunReport, RunIssue,
            RequestType, SubmitRequest, AttendanceRequest, RequestQuery, RequestPage, Decision,
            LeaveType, ApprovalStatus, LeaveRequest, ApplyLeave, CreatedResponse, LeaveQuery, PaginatedLeaveResponse,
            LeaveBalance, GenerateBalances, BalanceRun, BalanceQuery, BalancePage,
            Earnings, Deductions, Payslip, PayrollGroup, GeneratePayroll, FreezeOutcome,
            PayslipQuery, PaginatedPayslipResponse, BackfillResponse, GroupReq,
            StageStatus, ApprovalBag, LoanStage, LoanStatus, EmployeeLoan,
            InstallmentStatus, Installment, LoanInstallments,
            ApplyLoan, LoanQuery, LoanPage, StageDecision, ActivatedLoan
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, tokens and identity"),
        (name = "Attendance", description = "Punches, cycle and monthly attendance"),
        (name = "Requests", description = "Attendance corrections and overtime"),
        (name = "Leave", description = "Leave applications and balances"),
        (name = "Payroll", description = "Payslip generation and freezing"),
        (name = "Loans", description = "Employee loans and recovery"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_secured_payroll_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/payroll/generate"));
        assert!(doc.paths.paths.contains_key("/api/payroll/payslips/{empid}/{year}/{month}"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
