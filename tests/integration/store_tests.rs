use super::*;
use chrono::{TimeZone, Utc};
use deal_watcher::store::{CacheKey, MemoryPriceStore, PriceRecord};

fn record(retailer: &str, product: &str, price: &str) -> PriceRecord {
    PriceRecord {
        retailer: retailer.to_string(),
        product: product.to_string(),
        price: d(price),
        scraped_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_sqlite_store_persists_across_connections() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let url = database_url(&dir);

    {
        let store = SqlitePriceStore::connect(&url).await?;
        store
            .set_all(&[
                record("Boots", "Sun Cream", "19.99"),
                record("Amazon", "Sun Cream", "21.005"),
            ])
            .await?;
        store.close().await;
    }

    let store = SqlitePriceStore::connect(&url).await?;
    let snapshot = store.get_all().await?;

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[&CacheKey::new("Boots", "Sun Cream")], d("19.99"));
    assert_eq!(snapshot[&CacheKey::new("Amazon", "Sun Cream")], d("21.01"));

    let entries = store.entries().await?;
    assert!(entries.iter().all(|e| e.last_scrape == 1717243200));

    Ok(())
}

#[tokio::test]
async fn test_stores_agree_after_upserts() -> anyhow::Result<()> {
    let (_dir, sqlite) = sqlite_store().await?;
    let memory = MemoryPriceStore::new();

    let batches = [
        vec![record("Boots", "Serum", "40"), record("Boots", "Sun Cream", "25")],
        vec![record("Boots", "Serum", "32.50")],
    ];
    for batch in &batches {
        sqlite.set_all(batch).await?;
        memory.set_all(batch).await?;
    }

    assert_eq!(sqlite.get_all().await?, memory.get_all().await?);
    assert_eq!(
        sqlite.get_all().await?[&CacheKey::new("Boots", "Serum")],
        d("32.50")
    );

    Ok(())
}
