//! sqlx queries, one module per table family. Every function takes any
//! MySQL executor so the same query runs on the pool or inside a transaction.

pub mod attendance;
pub mod calendar;
pub mod employee;
pub mod leave;
pub mod leave_balance;
pub mod loan;
pub mod lock;
pub mod payslip;
pub mod request;
pub mod salary;
pub mod user;
