use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::employee::EmpId;
use super::leave_request::LeaveType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveBalance {
    pub empid: EmpId,
    pub year: i32,
    pub total_casual: Decimal,
    pub used_casual: Decimal,
    pub balance_casual: Decimal,
    pub total_sick: Decimal,
    pub used_sick: Decimal,
    pub balance_sick: Decimal,
    pub total_comp_off: Decimal,
    pub used_comp_off: Decimal,
    pub balance_comp_off: Decimal,
}

impl LeaveBalance {
    /// Empty row for a year; comp-off grants start here.
    pub fn zero(empid: EmpId, year: i32) -> Self {
        Self {
            empid,
            year,
            total_casual: Decimal::ZERO,
            used_casual: Decimal::ZERO,
            balance_casual: Decimal::ZERO,
            total_sick: Decimal::ZERO,
            used_sick: Decimal::ZERO,
            balance_sick: Decimal::ZERO,
            total_comp_off: Decimal::ZERO,
            used_comp_off: Decimal::ZERO,
            balance_comp_off: Decimal::ZERO,
        }
    }

    /// Record `days` of a paid leave as used. Unpaid types leave the row untouched.
    pub fn consume(&mut self, leave_type: LeaveType, days: Decimal) {
        let (used, balance) = match leave_type {
            LeaveType::Casual => (&mut self.used_casual, &mut self.balance_casual),
            LeaveType::Sick => (&mut self.used_sick, &mut self.balance_sick),
            LeaveType::CompOff => (&mut self.used_comp_off, &mut self.balance_comp_off),
            LeaveType::Lop | LeaveType::Other => return,
        };
        *used += days;
        *balance -= days;
    }

    pub fn grant_comp_off(&mut self, days: Decimal) {
        self.total_comp_off += days;
        self.balance_comp_off += days;
    }

    pub fn is_consistent(&self) -> bool {
        self.balance_casual == self.total_casual - self.used_casual
            && self.balance_sick == self.total_sick - self.used_sick
            && self.balance_comp_off == self.total_comp_off - self.used_comp_off
    }
}
