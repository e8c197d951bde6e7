use std::sync::Arc;

use chrono::Datelike;
use sqlx::MySqlPool;
use tracing::instrument;

use crate::auth::auth::AuthUser;
use crate::auth::capability::{Capability, check_approver};
use crate::clock::Clock;
use crate::engine::calendar::CalendarSnapshot;
use crate::engine::leave::{LeaveApplication, validate_application};
use crate::error::{AppError, AppResult};
use crate::model::employee::EmpId;
use crate::model::role::Role;
use crate::model::leave_request::{ApprovalStatus, LeaveRequest};
use crate::service::notify::{Notification, Notifier, dispatch};
use crate::store;
use crate::store::employee::Visibility;

/// Validate and store a leave application. Returns the new leave id.
#[instrument(skip(pool, app, reason), fields(from = %app.from, to = %app.to, leave_type = %app.leave_type))]
pub async fn apply_leave(pool: &MySqlPool, empid: &EmpId, app: LeaveApplication, reason: Option<&str>) -> AppResult<u64> {
    let mut tx = pool.begin().await?;
    // Row lock serializes concurrent applications of one employee.
    let employee = store::employee::lock(&mut *tx, empid).await?;
    if !employee.is_active {
        return Err(AppError::validation(format!("employee {empid} is inactive")));
    }

    let week_offs = store::calendar::week_offs_between(&mut *tx, app.from, app.to).await?;
    let holidays = store::calendar::holidays_between(&mut *tx, app.from, app.to).await?;
    let calendar = CalendarSnapshot::new(week_offs, holidays, Vec::new());
    let existing = store::leave::live_overlapping(&mut *tx, empid, app.from, app.to).await?;

    let duration = validate_application(&employee, &app, &calendar, &existing)?;
    let id = store::leave::insert(&mut *tx, empid, &app, duration, reason).await?;
    tx.commit().await?;

    tracing::info!(leave_id = id, %duration, "Leave applied");
    Ok(id)
}

/// Approve or reject a pending leave. Approving a paid leave charges the
/// applicant's balance for the year the leave starts in, when that row exists.
#[instrument(skip(pool, clock, notifier, approver), fields(approver = %approver.username))]
pub async fn decide_leave(
    pool: &MySqlPool,
    clock: &dyn Clock,
    notifier: Arc<dyn Notifier>,
    approver: &AuthUser,
    leave_id: u64,
    approve: bool,
) -> AppResult<LeaveRequest> {
    approver.require(Capability::LeaveApprover)?;

    let mut tx = pool.begin().await?;
    let mut leave = store::leave::lock(&mut *tx, leave_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("leave {leave_id} not found")))?;
    if leave.status != ApprovalStatus::Pending {
        return Err(AppError::precondition(format!("leave {leave_id} is already {}", leave.status)));
    }

    let applicant = store::employee::require(&mut *tx, &leave.empid).await?;
    check_approver(approver.role, approver.empid.as_ref(), &applicant)?;

    let status = if approve { ApprovalStatus::Approved } else { ApprovalStatus::Rejected };
    store::leave::set_status(&mut *tx, leave_id, status, approver.empid.as_ref(), clock.now()).await?;

    if approve && leave.leave_type.is_paid() {
        let year = leave.from_date.year();
        match store::leave_balance::lock(&mut *tx, &leave.empid, year).await? {
            Some(mut balance) => {
                balance.consume(leave.leave_type, leave.duration);
                store::leave_balance::save(&mut *tx, &balance).await?;
            }
            None => tracing::warn!(empid = %leave.empid, year, "No leave balance row to charge"),
        }
    }
    tx.commit().await?;

    leave.status = status;
    leave.decided_by = approver.empid.clone();
    tracing::info!(leave_id, %status, empid = %leave.empid, "Leave decided");
    dispatch(
        notifier,
        Notification::LeaveDecided {
            leave_id,
            empid: leave.empid.clone(),
            status,
        },
    );
    Ok(leave)
}

/// Whose leaves a caller may list. Admin and HR approvers see everyone, a
/// Manager sees themselves and direct reports, others only themselves.
pub fn leave_read_filter(user: &AuthUser, requested: Option<EmpId>) -> AppResult<Visibility> {
    if user.can(Capability::LeaveApprover) {
        match user.role {
            Role::Admin | Role::Hr => {
                return Ok(Visibility {
                    empid: requested,
                    team_of: None,
                });
            }
            Role::Manager => {
                let me = user.require_empid()?;
                return Ok(Visibility {
                    empid: requested,
                    team_of: Some(me.clone()),
                });
            }
            Role::Employee | Role::FrontDesk => {}
        }
    }
    let me = user.require_empid()?;
    match requested {
        Some(other) if &other != me => Err(AppError::forbidden(format!("cannot read leaves of employee {other}"))),
        _ => Ok(Visibility::only(me.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::capability::RoleCapabilities;

    fn user(role: Role, empid: Option<&str>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "u".into(),
            role,
            empid: empid.map(|e| EmpId::parse(e).unwrap()),
            capabilities: RoleCapabilities::default().for_role(role),
        }
    }

    #[test]
    fn employees_only_list_their_own_leaves() {
        let me = user(Role::Employee, Some("1001"));
        assert_eq!(leave_read_filter(&me, None).unwrap(), Visibility::only(EmpId::parse("1001").unwrap()));
        assert!(matches!(
            leave_read_filter(&me, Some(EmpId::parse("1002").unwrap())),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn hr_lists_anyone() {
        let hr = user(Role::Hr, None);
        assert_eq!(leave_read_filter(&hr, None).unwrap(), Visibility::default());
        assert_eq!(
            leave_read_filter(&hr, Some(EmpId::parse("1001").unwrap())).unwrap(),
            Visibility::only(EmpId::parse("1001").unwrap())
        );
    }

    #[test]
    fn managers_list_only_their_team() {
        let manager = user(Role::Manager, Some("2000"));
        let team = leave_read_filter(&manager, None).unwrap();
        assert_eq!(team.team_of, Some(EmpId::parse("2000").unwrap()));
        assert!(team.admits(&EmpId::parse("1001").unwrap(), Some(&EmpId::parse("2000").unwrap())));
        assert!(!team.admits(&EmpId::parse("1002").unwrap(), Some(&EmpId::parse("3000").unwrap())));

        let asked = leave_read_filter(&manager, Some(EmpId::parse("1002").unwrap())).unwrap();
        assert_eq!(asked.empid, Some(EmpId::parse("1002").unwrap()));
        assert_eq!(asked.team_of, Some(EmpId::parse("2000").unwrap()));

        assert!(leave_read_filter(&user(Role::Manager, None), None).is_err());
    }
}
