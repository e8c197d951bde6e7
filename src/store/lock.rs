use sqlx::{MySql, MySqlPool, pool::PoolConnection};

use crate::error::{AppError, AppResult};

/// Named MySQL advisory lock held on one pooled connection.
///
/// `GET_LOCK` is session scoped, so the connection is kept out of the pool
/// for as long as the lock is held. A guard dropped without `release`
/// closes its connection, which frees the lock server side.
pub struct RunLock {
    name: String,
    conn: Option<PoolConnection<MySql>>,
}

impl RunLock {
    /// Take `name` without waiting. Contention is a `Conflict`.
    pub async fn acquire(pool: &MySqlPool, name: impl Into<String>) -> AppResult<Self> {
        let name = name.into();
        let mut conn = pool.acquire().await?;

        let granted: Option<i64> = sqlx::query_scalar("SELECT GET_LOCK(?, 0)")
            .bind(&name)
            .fetch_one(&mut *conn)
            .await?;

        match granted {
            Some(1) => {
                tracing::debug!(lock = %name, "Advisory lock acquired");
                Ok(Self { name, conn: Some(conn) })
            }
            Some(_) => Err(AppError::conflict(format!("{name} is already running"))),
            None => Err(AppError::internal(format!("GET_LOCK failed for {name}"))),
        }
    }

    pub async fn release(mut self) -> AppResult<()> {
        if let Some(mut conn) = self.conn.take() {
            sqlx::query("SELECT RELEASE_LOCK(?)")
                .bind(&self.name)
                .execute(&mut *conn)
                .await?;
            tracing::debug!(lock = %self.name, "Advisory lock released");
        }
        Ok(())
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!(lock = %self.name, "Advisory lock dropped without release; closing its connection");
            drop(conn.detach());
        }
    }
}

pub fn attendance_key(month: u32, year: i32) -> String {
    format!("hrm:attendance:{year}-{month:02}")
}

pub fn payroll_key(month: u32, year: i32) -> String {
    format!("hrm:payroll:{year}-{month:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_names_are_per_cycle() {
        assert_eq!(attendance_key(3, 2026), "hrm:attendance:2026-03");
        assert_eq!(payroll_key(12, 2025), "hrm:payroll:2025-12");
        assert_ne!(attendance_key(12, 2025), payroll_key(12, 2025));
    }
}
