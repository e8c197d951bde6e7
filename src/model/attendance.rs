use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use super::employee::EmpId;

/// Audit label on a punch. Derivation never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PunchKind {
    In,
    Out,
    Mobile,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PunchEvent {
    pub id: u64,
    pub empid: EmpId,
    #[schema(value_type = String, format = "date")]
    pub punch_date: NaiveDate,
    #[schema(value_type = String, format = "date-time")]
    pub punch_time: NaiveDateTime,
    pub kind: Option<PunchKind>,
    pub location: Option<String>,
    pub image_ref: Option<String>,
}

impl PunchEvent {
    /// Punches at exactly 00:00:00 are placeholders, not real swipes.
    pub fn is_sentinel(&self) -> bool {
        self.punch_time.time().num_seconds_from_midnight() == 0
    }
}

/// Reconciled first/last punch of a day, refreshed after every punch.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct DayRecord {
    pub empid: EmpId,
    #[schema(value_type = String, format = "date")]
    pub work_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub in_time: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub out_time: Option<NaiveDateTime>,
    pub hours: Decimal,
}

/// Singleton (id = 1) describing shift timings and the attendance cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceCycle {
    #[schema(value_type = String, example = "09:30:00")]
    pub shift_start: NaiveTime,
    #[schema(value_type = String, example = "18:30:00")]
    pub shift_end: NaiveTime,
    #[schema(value_type = String, example = "09:45:00")]
    pub late_log_time: NaiveTime,
    /// Stored as a time of day, read as a duration since midnight.
    #[schema(value_type = String, example = "09:00:00")]
    pub full_day_duration: NaiveTime,
    #[schema(value_type = String, example = "04:30:00")]
    pub half_day_duration: NaiveTime,
    #[schema(example = 26)]
    pub cycle_start_day: u32,
    #[schema(example = 25)]
    pub cycle_end_day: u32,
}

fn since_midnight(t: NaiveTime) -> Duration {
    Duration::seconds(i64::from(t.num_seconds_from_midnight()))
}

impl AttendanceCycle {
    pub fn full_day(&self) -> Duration {
        since_midnight(self.full_day_duration)
    }

    pub fn half_day(&self) -> Duration {
        since_midnight(self.half_day_duration)
    }

    /// Start after end means the cycle begins in the previous month.
    pub fn spans_two_months(&self) -> bool {
        self.cycle_start_day > self.cycle_end_day
    }
}

/// Per-employee monthly attendance figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceSummary {
    pub empid: EmpId,
    pub name: String,
    #[schema(value_type = Option<String>, format = "date")]
    pub doj: Option<NaiveDate>,
    pub month: u32,
    pub year: i32,
    pub total_days: i32,
    pub working_days: i32,
    pub week_offs: i32,
    pub holidays: i32,
    pub presents: i32,
    pub absents: Decimal,
    pub half_days: Decimal,
    pub late_logs: i32,
    pub cl: Decimal,
    pub sl: Decimal,
    pub comp_offs: Decimal,
    pub lops: Decimal,
    pub payble_days: Decimal,
    pub status: i8,
}
