pub mod attendance;
pub mod calendar;
pub mod employee;
pub mod leave_balance;
pub mod leave_request;
pub mod loan;
pub mod payslip;
pub mod request;
pub mod role;
pub mod salary;
pub mod user;
