//! Pure attendance and payroll computations. Nothing in here touches the
//! database; the `service` layer loads inputs and persists outputs.

pub mod attendance;
pub mod calendar;
pub mod classifier;
pub mod cycle;
pub mod leave;
pub mod leave_balance;
pub mod loan;
pub mod payslip;
pub mod punch;
pub mod rounding;
pub mod salary;
