use sqlx::{Executor, MySql};

use crate::error::{AppError, AppResult};
use crate::model::employee::EmpId;
use crate::model::user::User;

pub async fn find_by_username<'e, E>(exec: E, username: &str) -> AppResult<Option<User>>
where
    E: Executor<'e, Database = MySql>,
{
    Ok(sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role_id, empid, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(exec)
    .await?)
}

pub async fn username_taken<'e, E>(exec: E, username: &str) -> AppResult<bool>
where
    E: Executor<'e, Database = MySql>,
{
    Ok(sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)")
        .bind(username)
        .fetch_one(exec)
        .await?)
}

pub async fn count<'e, E>(exec: E) -> AppResult<i64>
where
    E: Executor<'e, Database = MySql>,
{
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users").fetch_one(exec).await?)
}

pub async fn insert<'e, E>(exec: E, username: &str, hashed: &str, role_id: u8, empid: Option<&EmpId>) -> AppResult<u64>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query("INSERT INTO users (username, password, role_id, empid) VALUES (?, ?, ?, ?)")
        .bind(username)
        .bind(hashed)
        .bind(role_id)
        .bind(empid)
        .execute(exec)
        .await;

    match result {
        Ok(done) => Ok(done.last_insert_id()),
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            Err(AppError::conflict("Username or employee login already exists"))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn touch_login<'e, E>(exec: E, user_id: u64) -> AppResult<()>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(user_id)
        .execute(exec)
        .await?;
    Ok(())
}

/* =========================
Refresh tokens
========================= */

pub async fn store_refresh<'e, E>(exec: E, user_id: u64, jti: &str, exp: usize) -> AppResult<()>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, FROM_UNIXTIME(?))")
        .bind(user_id)
        .bind(jti)
        .bind(exp as i64)
        .execute(exec)
        .await?;
    Ok(())
}

/// Revoke a live refresh token. False when it was unknown or already revoked.
pub async fn revoke_refresh<'e, E>(exec: E, jti: &str) -> AppResult<bool>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE")
        .bind(jti)
        .execute(exec)
        .await?;
    Ok(result.rows_affected() > 0)
}
