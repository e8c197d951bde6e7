use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{Executor, MySql};

use crate::error::{AppError, AppResult};
use crate::model::attendance::{AttendanceCycle, AttendanceSummary, DayRecord, PunchEvent, PunchKind};
use crate::model::employee::EmpId;

const CYCLE_COLUMNS: &str = r#"
    shift_start, shift_end, late_log_time, full_day_duration,
    half_day_duration, cycle_start_day, cycle_end_day
"#;

const SUMMARY_COLUMNS: &str = r#"
    empid, name, doj, month, year, total_days, working_days, week_offs, holidays,
    presents, absents, half_days, late_logs, cl, sl, comp_offs, lops, payble_days, status
"#;

/* =========================
Punches
========================= */

pub struct NewPunch<'a> {
    pub empid: &'a EmpId,
    pub at: NaiveDateTime,
    pub kind: PunchKind,
    pub location: Option<&'a str>,
    pub image_ref: Option<&'a str>,
}

pub async fn insert_punch<'e, E>(exec: E, punch: NewPunch<'_>) -> AppResult<u64>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO punches (empid, punch_date, punch_time, kind, location, image_ref)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(punch.empid)
    .bind(punch.at.date())
    .bind(punch.at)
    .bind(punch.kind)
    .bind(punch.location)
    .bind(punch.image_ref)
    .execute(exec)
    .await?;

    Ok(result.last_insert_id())
}

pub async fn punches_on<'e, E>(exec: E, empid: &EmpId, date: NaiveDate) -> AppResult<Vec<PunchEvent>>
where
    E: Executor<'e, Database = MySql>,
{
    Ok(sqlx::query_as::<_, PunchEvent>(
        r#"
        SELECT id, empid, punch_date, punch_time, kind, location, image_ref
        FROM punches
        WHERE empid = ? AND punch_date = ?
        ORDER BY punch_time
        "#,
    )
    .bind(empid)
    .bind(date)
    .fetch_all(exec)
    .await?)
}

pub async fn punches_between<'e, E>(
    exec: E,
    first: NaiveDate,
    last: NaiveDate,
    only: Option<&EmpId>,
) -> AppResult<Vec<PunchEvent>>
where
    E: Executor<'e, Database = MySql>,
{
    let mut sql = String::from(
        r#"
        SELECT id, empid, punch_date, punch_time, kind, location, image_ref
        FROM punches
        WHERE punch_date BETWEEN ? AND ?
        "#,
    );
    if only.is_some() {
        sql.push_str(" AND empid = ?");
    }

    let mut query = sqlx::query_as::<_, PunchEvent>(&sql).bind(first).bind(last);
    if let Some(empid) = only {
        query = query.bind(empid);
    }
    Ok(query.fetch_all(exec).await?)
}

/* =========================
Reconciled days
========================= */

pub async fn upsert_day<'e, E>(exec: E, day: &DayRecord) -> AppResult<()>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query(
        r#"
        INSERT INTO attendance_days (empid, work_date, in_time, out_time, hours)
        VALUES (?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            in_time = VALUES(in_time),
            out_time = VALUES(out_time),
            hours = VALUES(hours)
        "#,
    )
    .bind(&day.empid)
    .bind(day.work_date)
    .bind(day.in_time)
    .bind(day.out_time)
    .bind(day.hours)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn days_between<'e, E>(exec: E, empid: &EmpId, first: NaiveDate, last: NaiveDate) -> AppResult<Vec<DayRecord>>
where
    E: Executor<'e, Database = MySql>,
{
    Ok(sqlx::query_as::<_, DayRecord>(
        r#"
        SELECT empid, work_date, in_time, out_time, hours
        FROM attendance_days
        WHERE empid = ? AND work_date BETWEEN ? AND ?
        ORDER BY work_date
        "#,
    )
    .bind(empid)
    .bind(first)
    .bind(last)
    .fetch_all(exec)
    .await?)
}

/* =========================
Cycle singleton
========================= */

fn cycle_missing() -> AppError {
    AppError::precondition("attendance cycle is not configured")
}

pub async fn load_cycle<'e, E>(exec: E) -> AppResult<AttendanceCycle>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {CYCLE_COLUMNS} FROM attendance_cycle WHERE id = 1");
    sqlx::query_as::<_, AttendanceCycle>(&sql)
        .fetch_optional(exec)
        .await?
        .ok_or_else(cycle_missing)
}

/// Row-locking read for writers.
pub async fn lock_cycle<'e, E>(exec: E) -> AppResult<AttendanceCycle>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {CYCLE_COLUMNS} FROM attendance_cycle WHERE id = 1 FOR UPDATE");
    sqlx::query_as::<_, AttendanceCycle>(&sql)
        .fetch_optional(exec)
        .await?
        .ok_or_else(cycle_missing)
}

pub async fn save_cycle<'e, E>(exec: E, cycle: &AttendanceCycle) -> AppResult<()>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query(
        r#"
        UPDATE attendance_cycle
        SET shift_start = ?, shift_end = ?, late_log_time = ?, full_day_duration = ?,
            half_day_duration = ?, cycle_start_day = ?, cycle_end_day = ?
        WHERE id = 1
        "#,
    )
    .bind(cycle.shift_start)
    .bind(cycle.shift_end)
    .bind(cycle.late_log_time)
    .bind(cycle.full_day_duration)
    .bind(cycle.half_day_duration)
    .bind(cycle.cycle_start_day)
    .bind(cycle.cycle_end_day)
    .execute(exec)
    .await?;
    Ok(())
}

/* =========================
Summaries
========================= */

pub async fn upsert_summary<'e, E>(exec: E, s: &AttendanceSummary) -> AppResult<()>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query(
        r#"
        INSERT INTO attendance_summaries
            (empid, name, doj, month, year, total_days, working_days, week_offs, holidays,
             presents, absents, half_days, late_logs, cl, sl, comp_offs, lops, payble_days, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            name = VALUES(name), doj = VALUES(doj), total_days = VALUES(total_days),
            working_days = VALUES(working_days), week_offs = VALUES(week_offs),
            holidays = VALUES(holidays), presents = VALUES(presents), absents = VALUES(absents),
            half_days = VALUES(half_days), late_logs = VALUES(late_logs), cl = VALUES(cl),
            sl = VALUES(sl), comp_offs = VALUES(comp_offs), lops = VALUES(lops),
            payble_days = VALUES(payble_days), status = VALUES(status)
        "#,
    )
    .bind(&s.empid)
    .bind(&s.name)
    .bind(s.doj)
    .bind(s.month)
    .bind(s.year)
    .bind(s.total_days)
    .bind(s.working_days)
    .bind(s.week_offs)
    .bind(s.holidays)
    .bind(s.presents)
    .bind(s.absents)
    .bind(s.half_days)
    .bind(s.late_logs)
    .bind(s.cl)
    .bind(s.sl)
    .bind(s.comp_offs)
    .bind(s.lops)
    .bind(s.payble_days)
    .bind(s.status)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn find_summary<'e, E>(exec: E, empid: &EmpId, month: u32, year: i32) -> AppResult<Option<AttendanceSummary>>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {SUMMARY_COLUMNS} FROM attendance_summaries WHERE empid = ? AND month = ? AND year = ?");
    Ok(sqlx::query_as::<_, AttendanceSummary>(&sql)
        .bind(empid)
        .bind(month)
        .bind(year)
        .fetch_optional(exec)
        .await?)
}

#[derive(Debug, Clone)]
pub struct SummaryFilter {
    pub month: u32,
    pub year: i32,
    pub empid: Option<EmpId>,
    /// Only rows whose payslip for the same cycle is frozen.
    pub frozen_only: bool,
}

impl SummaryFilter {
    fn where_sql(&self) -> String {
        let mut sql = String::from(" WHERE s.month = ? AND s.year = ?");
        if self.empid.is_some() {
            sql.push_str(" AND s.empid = ?");
        }
        if self.frozen_only {
            sql.push_str(
                r#" AND EXISTS (
                    SELECT 1 FROM payslips p
                    WHERE p.empid = s.empid AND p.month = s.month AND p.year = s.year
                      AND p.freaze_status = TRUE)"#,
            );
        }
        sql
    }
}

pub async fn count_summaries<'e, E>(exec: E, filter: &SummaryFilter) -> AppResult<i64>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT COUNT(*) FROM attendance_summaries s{}", filter.where_sql());
    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(filter.month).bind(filter.year);
    if let Some(empid) = &filter.empid {
        query = query.bind(empid);
    }
    Ok(query.fetch_one(exec).await?)
}

pub async fn list_summaries<'e, E>(exec: E, filter: &SummaryFilter, limit: u32, offset: u64) -> AppResult<Vec<AttendanceSummary>>
where
    E: Executor<'e, Database = MySql>,
{
    let columns = SUMMARY_COLUMNS
        .split(',')
        .map(|c| format!("s.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {columns} FROM attendance_summaries s{} ORDER BY s.empid LIMIT ? OFFSET ?",
        filter.where_sql()
    );

    let mut query = sqlx::query_as::<_, AttendanceSummary>(&sql).bind(filter.month).bind(filter.year);
    if let Some(empid) = &filter.empid {
        query = query.bind(empid);
    }
    Ok(query.bind(limit).bind(offset).fetch_all(exec).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_filter_adds_freeze_gate_for_self_readers() {
        let mut filter = SummaryFilter {
            month: 12,
            year: 2025,
            empid: None,
            frozen_only: false,
        };
        assert!(!filter.where_sql().contains("payslips"));

        filter.frozen_only = true;
        filter.empid = Some(EmpId::parse("1001").unwrap());
        let sql = filter.where_sql();
        assert!(sql.contains("s.empid = ?"));
        assert!(sql.contains("freaze_status = TRUE"));
    }
}
