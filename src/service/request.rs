use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveTime};
use sqlx::MySqlPool;
use tracing::instrument;

use crate::auth::auth::AuthUser;
use crate::auth::capability::{Capability, check_approver};
use crate::clock::Clock;
use crate::engine::calendar::CalendarSnapshot;
use crate::engine::leave_balance::comp_off_grant;
use crate::error::{AppError, AppResult};
use crate::model::attendance::PunchKind;
use crate::model::employee::EmpId;
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::ApprovalStatus;
use crate::model::request::{AttendanceRequest, RequestType};
use crate::service::attendance::reconcile_day;
use crate::service::notify::{Notification, Notifier, dispatch};
use crate::store::{self, attendance::NewPunch, request::NewRequest};

#[derive(Debug, Clone)]
pub struct Submission {
    pub request_type: RequestType,
    pub date: NaiveDate,
    pub in_time: Option<NaiveTime>,
    pub out_time: Option<NaiveTime>,
    pub reason: Option<String>,
}

/// Field rules that need no database.
fn check_times(s: &Submission) -> AppResult<()> {
    if s.request_type.needs_in_time() && s.in_time.is_none() {
        return Err(AppError::validation(format!("{} request needs in_time", s.request_type)));
    }
    if s.request_type.needs_out_time() && s.out_time.is_none() {
        return Err(AppError::validation(format!("{} request needs out_time", s.request_type)));
    }
    if let (Some(i), Some(o)) = (s.in_time, s.out_time) {
        if i >= o {
            return Err(AppError::validation("in_time must be before out_time"));
        }
    }
    Ok(())
}

/// Raise an attendance correction or overtime request for `empid`.
#[instrument(skip(pool, submission), fields(request_type = %submission.request_type, date = %submission.date))]
pub async fn submit_request(pool: &MySqlPool, empid: &EmpId, submission: Submission) -> AppResult<u64> {
    check_times(&submission)?;

    let mut tx = pool.begin().await?;
    let employee = store::employee::lock(&mut *tx, empid).await?;

    if submission.request_type == RequestType::OvertimeCompOff {
        let date = submission.date;
        let week_offs = store::calendar::week_offs_between(&mut *tx, date, date).await?;
        let holidays = store::calendar::holidays_between(&mut *tx, date, date).await?;
        let calendar = CalendarSnapshot::new(week_offs, holidays, Vec::new());
        if !calendar.is_week_off(empid, date) && !calendar.is_holiday(&employee, date) {
            return Err(AppError::validation(format!(
                "overtime comp-off is only allowed on a week-off or holiday ({date})"
            )));
        }
    }

    if store::request::live_on_date(&mut *tx, empid, submission.date).await? {
        return Err(AppError::validation(format!(
            "a request for {} already exists",
            submission.date
        )));
    }

    let id = store::request::insert(
        &mut *tx,
        NewRequest {
            empid,
            request_type: submission.request_type,
            request_date: submission.date,
            in_time: submission.in_time,
            out_time: submission.out_time,
            reason: submission.reason.as_deref(),
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(request_id = id, "Attendance request submitted");
    Ok(id)
}

/// Approve or reject a pending request. Approval writes the requested
/// times as punches, refreshes the day and, for overtime, grants comp-off
/// on the current year's balance row.
#[instrument(skip(pool, clock, notifier, approver), fields(approver = %approver.username))]
pub async fn decide_request(
    pool: &MySqlPool,
    clock: &dyn Clock,
    notifier: Arc<dyn Notifier>,
    approver: &AuthUser,
    request_id: u64,
    approve: bool,
) -> AppResult<AttendanceRequest> {
    approver.require(Capability::LeaveApprover)?;

    let mut tx = pool.begin().await?;
    let mut request = store::request::lock(&mut *tx, request_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("request {request_id} not found")))?;
    if request.status != ApprovalStatus::Pending {
        return Err(AppError::precondition(format!(
            "request {request_id} is already {}",
            request.status
        )));
    }

    let applicant = store::employee::require(&mut *tx, &request.empid).await?;
    check_approver(approver.role, approver.empid.as_ref(), &applicant)?;

    let now = clock.now();
    let status = if approve { ApprovalStatus::Approved } else { ApprovalStatus::Rejected };
    store::request::set_status(&mut *tx, request_id, status, approver.empid.as_ref(), now).await?;

    if approve {
        let empid = &request.empid;
        let date = request.request_date;
        let synthetic = [(request.in_time, PunchKind::In), (request.out_time, PunchKind::Out)];
        for (time, kind) in synthetic {
            let Some(time) = time else { continue };
            store::attendance::insert_punch(
                &mut *tx,
                NewPunch {
                    empid,
                    at: date.and_time(time),
                    kind,
                    location: None,
                    image_ref: None,
                },
            )
            .await?;
        }
        reconcile_day(&mut *tx, empid, date).await?;

        if let (RequestType::OvertimeCompOff, Some(i), Some(o)) = (request.request_type, request.in_time, request.out_time) {
            let grant = comp_off_grant(i, o);
            if grant > rust_decimal::Decimal::ZERO {
                let year = clock.today().year();
                let mut balance = store::leave_balance::lock(&mut *tx, empid, year)
                    .await?
                    .unwrap_or_else(|| LeaveBalance::zero(empid.clone(), year));
                balance.grant_comp_off(grant);
                store::leave_balance::save(&mut *tx, &balance).await?;
                tracing::info!(%empid, year, %grant, "Comp-off granted");
            }
        }
    }
    tx.commit().await?;

    request.status = status;
    request.decided_by = approver.empid.clone();
    tracing::info!(request_id, %status, empid = %request.empid, "Attendance request decided");
    dispatch(
        notifier,
        Notification::RequestDecided {
            request_id,
            empid: request.empid.clone(),
            status,
        },
    );
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn submission(request_type: RequestType, in_time: Option<NaiveTime>, out_time: Option<NaiveTime>) -> Submission {
        Submission {
            request_type,
            date: NaiveDate::from_ymd_opt(2025, 12, 6).unwrap(),
            in_time,
            out_time,
            reason: None,
        }
    }

    #[test]
    fn required_times_are_enforced() {
        assert!(check_times(&submission(RequestType::InTime, Some(t(9, 30)), None)).is_ok());
        assert!(check_times(&submission(RequestType::OutTime, None, Some(t(18, 30)))).is_ok());
        assert!(check_times(&submission(RequestType::FullDay, Some(t(9, 30)), None)).is_err());
        assert!(check_times(&submission(RequestType::OvertimeCompOff, None, Some(t(18, 0)))).is_err());
    }

    #[test]
    fn in_time_must_precede_out_time() {
        let err = check_times(&submission(RequestType::FullDay, Some(t(18, 30)), Some(t(9, 30)))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(check_times(&submission(RequestType::FullDay, Some(t(9, 30)), Some(t(9, 30)))).is_err());
    }
}
