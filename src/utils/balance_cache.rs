use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::OnceCell;
use sqlx::MySqlPool;

use crate::model::{attendance::AttendanceEntry, payment::PaymentEntry};
use crate::settlement::SiteBalances;

/// Balances are cumulative, so a site's report only depends on the last day
/// it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BalanceKey {
    pub site_id: u64,
    pub to: NaiveDate,
}

static BALANCE_CACHE: OnceCell<Cache<BalanceKey, Arc<SiteBalances>>> = OnceCell::new();

const DEFAULT_CAPACITY: u64 = 2_000;
const DEFAULT_TTL_SECS: u64 = 300;

fn build(capacity: u64, ttl: Duration) -> Cache<BalanceKey, Arc<SiteBalances>> {
    Cache::builder()
        .max_capacity(capacity)
        .time_to_live(ttl)
        .support_invalidation_closures()
        .build()
}

/// Size the cache from configuration. Later calls are ignored.
pub fn init(capacity: u64, ttl: Duration) {
    if BALANCE_CACHE.set(build(capacity, ttl)).is_err() {
        log::warn!("Balance cache already initialised, keeping existing settings");
    }
}

fn cache() -> &'static Cache<BalanceKey, Arc<SiteBalances>> {
    BALANCE_CACHE.get_or_init(|| build(DEFAULT_CAPACITY, Duration::from_secs(DEFAULT_TTL_SECS)))
}

async fn load(pool: &MySqlPool, key: BalanceKey) -> Result<Arc<SiteBalances>, sqlx::Error> {
    let entries = AttendanceEntry::fetch_for_site(pool, key.site_id, key.to).await?;
    let payments = PaymentEntry::fetch_for_site(pool, key.site_id, key.to).await?;

    Ok(Arc::new(SiteBalances::compute(&entries, &payments)))
}

/// Balances of a site up to `to`, computed once per cache lifetime.
pub async fn site_balances(
    pool: &MySqlPool,
    site_id: u64,
    to: NaiveDate,
) -> Result<Arc<SiteBalances>, Arc<sqlx::Error>> {
    let key = BalanceKey { site_id, to };
    cache().try_get_with(key, load(pool, key)).await
}

/// Drop every cached report of a site after its payments changed.
pub fn invalidate_site(site_id: u64) {
    if let Err(e) = cache().invalidate_entries_if(move |key, _| key.site_id == site_id) {
        log::warn!("Falling back to full balance cache flush: {}", e);
        cache().invalidate_all();
    }
}

/// Precompute today's balances of sites that still owe wages (batched)
pub async fn warmup_balance_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let today = chrono::Local::now().date_naive();

    let mut stream = sqlx::query_as::<_, (u64,)>(
        r#"
        SELECT DISTINCT site_id
        FROM attendance
        WHERE work_date >= CURDATE() - INTERVAL ? DAY
        AND payment_state <> 'paid'
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (site_id,) = row?;
        batch.push(site_id);
        total += 1;

        if batch.len() >= batch_size {
            load_batch(pool, &batch, today).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        load_batch(pool, &batch, today).await;
    }

    log::info!(
        "Balance cache warmup complete: {} sites with unpaid attendance (last {} days)",
        total,
        days
    );

    Ok(())
}

async fn load_batch(pool: &MySqlPool, site_ids: &[u64], to: NaiveDate) {
    let futures: Vec<_> = site_ids
        .iter()
        .map(|&site_id| site_balances(pool, site_id, to))
        .collect();

    for (site_id, result) in site_ids.iter().zip(futures::future::join_all(futures).await) {
        if let Err(e) = result {
            log::warn!("Skipping balance warmup for site {}: {}", site_id, e);
        }
    }
}
