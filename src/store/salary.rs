use futures_util::stream::BoxStream;
use sqlx::{Executor, MySql};

use crate::error::AppResult;
use crate::model::employee::EmpId;
use crate::model::salary::{PayrollGroup, SalaryStructure};

pub async fn find_structure<'e, E>(exec: E, empid: &EmpId) -> AppResult<Option<SalaryStructure>>
where
    E: Executor<'e, Database = MySql>,
{
    Ok(sqlx::query_as::<_, SalaryStructure>(
        r#"
        SELECT empid, salary_per_month, basic, pf_check, esi_check
        FROM salary_structures
        WHERE empid = ?
        "#,
    )
    .bind(empid)
    .fetch_optional(exec)
    .await?)
}

pub async fn group_of<'e, E>(exec: E, empid: &EmpId) -> AppResult<Option<PayrollGroup>>
where
    E: Executor<'e, Database = MySql>,
{
    Ok(sqlx::query_scalar::<_, PayrollGroup>("SELECT group_tag FROM payroll_groups WHERE empid = ?")
        .bind(empid)
        .fetch_optional(exec)
        .await?)
}

/// Every tagged empid, streamed for cache warmup.
pub fn stream_groups<'e, E>(exec: E) -> BoxStream<'e, Result<(EmpId, PayrollGroup), sqlx::Error>>
where
    E: Executor<'e, Database = MySql> + 'e,
{
    sqlx::query_as::<_, (EmpId, PayrollGroup)>("SELECT empid, group_tag FROM payroll_groups").fetch(exec)
}

/// Tag or untag an empid.
pub async fn set_group<'e, E>(exec: E, empid: &EmpId, group: Option<PayrollGroup>) -> AppResult<()>
where
    E: Executor<'e, Database = MySql>,
{
    match group {
        Some(tag) => {
            sqlx::query(
                r#"
                INSERT INTO payroll_groups (empid, group_tag) VALUES (?, ?)
                ON DUPLICATE KEY UPDATE group_tag = VALUES(group_tag)
                "#,
            )
            .bind(empid)
            .bind(tag)
            .execute(exec)
            .await?;
        }
        None => {
            sqlx::query("DELETE FROM payroll_groups WHERE empid = ?")
                .bind(empid)
                .execute(exec)
                .await?;
        }
    }
    Ok(())
}
