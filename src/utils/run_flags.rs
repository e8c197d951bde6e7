use moka::future::Cache;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum_macros::Display;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunKind {
    Attendance,
    Payroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub kind: RunKind,
    pub month: u32,
    pub year: i32,
}

impl RunKey {
    pub fn new(kind: RunKind, month: u32, year: i32) -> Self {
        Self { kind, month, year }
    }
}

/// false => running, true => cancel requested. Absent => no run.
/// The TTL only reaps flags of runs that died without `finish`.
static RUN_FLAGS: Lazy<Cache<RunKey, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(1_000)
        .time_to_live(Duration::from_secs(6 * 3600))
        .build()
});

/// Mark a run as started. Clears any stale cancel request.
pub async fn register(key: RunKey) {
    RUN_FLAGS.insert(key, false).await;
}

/// Ask a running run to stop. False when no such run is registered.
pub async fn cancel(key: RunKey) -> bool {
    if RUN_FLAGS.get(&key).await.is_none() {
        return false;
    }
    RUN_FLAGS.insert(key, true).await;
    true
}

pub async fn is_cancelled(key: RunKey) -> bool {
    RUN_FLAGS.get(&key).await.unwrap_or(false)
}

pub async fn finish(key: RunKey) {
    RUN_FLAGS.invalidate(&key).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn cancel_only_reaches_registered_runs() {
        let key = RunKey::new(RunKind::Payroll, 7, 1999);
        assert!(!cancel(key).await);

        register(key).await;
        assert!(!is_cancelled(key).await);
        assert!(cancel(key).await);
        assert!(is_cancelled(key).await);

        finish(key).await;
        assert!(!is_cancelled(key).await);
    }

    #[actix_web::test]
    async fn kinds_do_not_share_flags() {
        let payroll = RunKey::new(RunKind::Payroll, 8, 1999);
        let attendance = RunKey::new(RunKind::Attendance, 8, 1999);
        register(payroll).await;
        register(attendance).await;
        cancel(payroll).await;

        assert!(is_cancelled(payroll).await);
        assert!(!is_cancelled(attendance).await);

        finish(payroll).await;
        finish(attendance).await;
    }
}
