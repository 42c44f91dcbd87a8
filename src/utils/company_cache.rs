use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::OnceCell;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::model::company::Company;

const DEFAULT_TTL_SECS: u64 = 300;

static COMPANY_CACHE: OnceCell<Cache<u64, Company>> = OnceCell::new();

fn build(ttl_secs: u64) -> Cache<u64, Company> {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(ttl_secs))
        .build()
}

/// Set the TTL before first use; later calls are ignored.
pub fn init(ttl_secs: u64) {
    let _ = COMPANY_CACHE.set(build(ttl_secs));
}

fn cache() -> &'static Cache<u64, Company> {
    COMPANY_CACHE.get_or_init(|| build(DEFAULT_TTL_SECS))
}

/// Cached company settings, loaded from the database on a miss.
pub async fn get_company(pool: &MySqlPool, company_id: u64) -> Result<Option<Company>, sqlx::Error> {
    if let Some(company) = cache().get(&company_id).await {
        return Ok(Some(company));
    }

    let company = sqlx::query_as::<_, Company>(
        r#"
        SELECT id, name, utc_offset_minutes, delay_grace_minutes, early_checkin_minutes
        FROM companies
        WHERE id = ?
        "#,
    )
    .bind(company_id)
    .fetch_optional(pool)
    .await?;

    if let Some(company) = &company {
        cache().insert(company_id, company.clone()).await;
    }

    Ok(company)
}

pub async fn invalidate(company_id: u64) {
    cache().invalidate(&company_id).await;
}

/// Preload every company, inserting in batches.
pub async fn warmup_company_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, Company>(
        r#"
        SELECT id, name, utc_offset_minutes, delay_grace_minutes, early_checkin_minutes
        FROM companies
        "#,
    )
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        batch.push(row?);
        total += 1;

        if batch.len() >= batch_size {
            insert_batch(&mut batch).await;
        }
    }

    if !batch.is_empty() {
        insert_batch(&mut batch).await;
    }

    log::info!("Company cache warmup complete: {} companies", total);
    Ok(())
}

async fn insert_batch(batch: &mut Vec<Company>) {
    let futures: Vec<_> = batch
        .drain(..)
        .map(|c| cache().insert(c.id, c))
        .collect();

    futures::future::join_all(futures).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn invalidate_drops_cached_entry() {
        let company = Company {
            id: 4242,
            name: "Cached".into(),
            utc_offset_minutes: 0,
            delay_grace_minutes: 5,
            early_checkin_minutes: 120,
        };
        cache().insert(company.id, company.clone()).await;
        assert_eq!(cache().get(&4242).await.map(|c| c.name), Some("Cached".to_string()));

        invalidate(4242).await;
        assert!(cache().get(&4242).await.is_none());
    }
}
