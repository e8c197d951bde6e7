use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use super::employee::EmpId;
use super::leave_request::ApprovalStatus;

/// Attendance correction and overtime requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RequestType {
    FullDay,
    InTime,
    OutTime,
    OvertimeCompOff,
}

impl RequestType {
    pub fn needs_in_time(self) -> bool {
        !matches!(self, RequestType::OutTime)
    }

    pub fn needs_out_time(self) -> bool {
        !matches!(self, RequestType::InTime)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRequest {
    pub id: u64,
    pub empid: EmpId,
    pub request_type: RequestType,
    #[schema(value_type = String, format = "date")]
    pub request_date: NaiveDate,
    #[schema(value_type = Option<String>, example = "09:30:00")]
    pub in_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "18:30:00")]
    pub out_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub status: ApprovalStatus,
    pub decided_by: Option<EmpId>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn wire_names_are_kebab_case() {
        assert_eq!(
            RequestType::from_str("overtime-comp-off").unwrap(),
            RequestType::OvertimeCompOff
        );
        assert_eq!(RequestType::FullDay.to_string(), "full-day");
    }

    #[test]
    fn required_times_per_type() {
        assert!(RequestType::InTime.needs_in_time());
        assert!(!RequestType::InTime.needs_out_time());
        assert!(!RequestType::OutTime.needs_in_time());
        assert!(RequestType::FullDay.needs_in_time() && RequestType::FullDay.needs_out_time());
        assert!(RequestType::OvertimeCompOff.needs_out_time());
    }
}
