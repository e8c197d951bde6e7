//! Calendar resolution: week-offs, branch holidays, approved leaves and the
//! employee's in-service window.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::warn;

use crate::engine::cycle::CycleWindow;
use crate::model::calendar::{Holiday, WeekOffEntry, WeekOffScope};
use crate::model::employee::{EmpId, Employee};
use crate::model::leave_request::{ApprovalStatus, LeaveRequest, LeaveType};

/// The leave that claims a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveDay {
    pub leave_id: u64,
    pub leave_type: LeaveType,
    /// 1 for a full day, 0.5 on a half-marked endpoint.
    pub share: Decimal,
}

/// Read-only calendar data for one run.
#[derive(Debug, Default)]
pub struct CalendarSnapshot {
    global_week_offs: HashSet<NaiveDate>,
    employee_week_offs: HashMap<EmpId, HashSet<NaiveDate>>,
    holidays: HashMap<NaiveDate, Vec<Holiday>>,
    leaves: HashMap<EmpId, Vec<LeaveRequest>>,
}

impl CalendarSnapshot {
    pub fn new(week_offs: Vec<WeekOffEntry>, holidays: Vec<Holiday>, leaves: Vec<LeaveRequest>) -> Self {
        let mut snapshot = Self::default();

        for entry in week_offs {
            match entry.scope {
                WeekOffScope::All => {
                    snapshot.global_week_offs.insert(entry.date);
                }
                WeekOffScope::Employee(empid) => {
                    snapshot.employee_week_offs.entry(empid).or_default().insert(entry.date);
                }
            }
        }

        for holiday in holidays {
            snapshot.holidays.entry(holiday.holiday_date).or_default().push(holiday);
        }

        for leave in leaves.into_iter().filter(|l| l.status == ApprovalStatus::Approved) {
            snapshot.leaves.entry(leave.empid.clone()).or_default().push(leave);
        }
        for list in snapshot.leaves.values_mut() {
            list.sort_by_key(|l| (l.from_date, l.id));
        }

        snapshot
    }

    pub fn is_week_off(&self, empid: &EmpId, date: NaiveDate) -> bool {
        self.global_week_offs.contains(&date)
            || self
                .employee_week_offs
                .get(empid)
                .is_some_and(|dates| dates.contains(&date))
    }

    pub fn is_holiday(&self, employee: &Employee, date: NaiveDate) -> bool {
        let branch = employee.branch();
        self.holidays
            .get(&date)
            .is_some_and(|list| list.iter().any(|h| h.applies_to_branch(branch)))
    }

    /// Approved leave covering `date`. Overlapping approvals resolve to the
    /// one with the earliest `from_date` (then lowest id).
    pub fn leave_on(&self, empid: &EmpId, date: NaiveDate) -> Option<LeaveDay> {
        let list = self.leaves.get(empid)?;
        let mut covering = list.iter().filter(|l| l.covers(date));
        let chosen = covering.next()?;

        let others: Vec<u64> = covering.map(|l| l.id).collect();
        if !others.is_empty() {
            warn!(
                empid = %empid,
                %date,
                chosen = chosen.id,
                ignored = ?others,
                "Overlapping approved leaves, earliest from_date wins"
            );
        }

        Some(LeaveDay {
            leave_id: chosen.id,
            leave_type: chosen.leave_type,
            share: chosen.share_on(date),
        })
    }
}

/// Days within the cycle during which the employee was on the rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ServiceSpan {
    /// `None` when the employee joined after the cycle or left before it.
    pub fn resolve(employee: &Employee, window: &CycleWindow) -> Option<Self> {
        let start = match employee.doj {
            Some(doj) if doj > window.first => doj,
            _ => window.first,
        };
        let end = match employee.emp_inactive_date {
            Some(left) if left < window.last => left,
            _ => window.last,
        };

        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn total_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}
