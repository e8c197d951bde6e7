use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::error::AppResult;
use crate::model::employee::EmpId;
use crate::model::salary::PayrollGroup;
use crate::store;

/// Some(tag) => empid belongs to a payroll group
/// None      => looked up, not in any group
pub static GROUP_CACHE: Lazy<Cache<EmpId, Option<PayrollGroup>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(3600))
        .build()
});

/// Group tag for `empid`, read through the cache.
pub async fn group_of(pool: &MySqlPool, empid: &EmpId) -> AppResult<Option<PayrollGroup>> {
    if let Some(hit) = GROUP_CACHE.get(empid).await {
        return Ok(hit);
    }

    let group = store::salary::group_of(pool, empid).await?;
    GROUP_CACHE.insert(empid.clone(), group).await;
    Ok(group)
}

/// Drop a cached tag after `payroll_groups` changed for `empid`.
pub async fn invalidate(empid: &EmpId) {
    GROUP_CACHE.invalidate(empid).await;
}

async fn batch_insert(entries: &[(EmpId, PayrollGroup)]) {
    let futures: Vec<_> = entries
        .iter()
        .map(|(empid, group)| GROUP_CACHE.insert(empid.clone(), Some(*group)))
        .collect();

    futures::future::join_all(futures).await;
}

/// Load every tagged empid into the cache (batched).
pub async fn warmup_group_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = store::salary::stream_groups(pool);

    let batch_size = batch_size.max(1);
    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        batch.push(row?);
        total += 1;

        if batch.len() >= batch_size {
            batch_insert(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_insert(&batch).await;
    }

    tracing::info!(total, "Payroll group cache warmup complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn invalidate_forgets_cached_tag() {
        let empid = EmpId::parse("990001").unwrap();
        batch_insert(&[(empid.clone(), PayrollGroup::B)]).await;
        assert_eq!(GROUP_CACHE.get(&empid).await, Some(Some(PayrollGroup::B)));

        invalidate(&empid).await;
        assert_eq!(GROUP_CACHE.get(&empid).await, None);
    }
}
