use super::*;
use deal_watcher::store::CacheKey;

const BOOTS_SUN: &str = "https://boots.test/sun";
const AMAZON_SUN: &str = "https://amazon.test/sun";
const BOOTS_SERUM: &str = "https://boots.test/serum";

#[tokio::test]
async fn test_deadband_across_cycles() -> anyhow::Result<()> {
    let (_dir, store) = sqlite_store().await?;
    let extractor = Arc::new(ScriptedExtractor::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = runner(catalog(extractor.clone())?, store.clone(), notifier.clone())?;

    // First sighting: anything under the base threshold is news.
    extractor.set(BOOTS_SUN, "85");
    extractor.set(AMAZON_SUN, "95");
    extractor.set(BOOTS_SERUM, "30");

    let report = runner.run_cycle().await?;
    assert_eq!(report.links_checked, 3);
    assert_eq!(report.observations, 3);
    assert_eq!(report.notified_products, 2);
    assert!(report.alert_sent);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    let first = &messages[0];
    assert!(first.find("### Other").unwrap() < first.find("### Skincare").unwrap());
    assert!(first.contains("Best price: 🆕 **£85.00** at [Boots](https://boots.test/sun)"));
    assert!(first.contains("Best price: 🆕 **£30.00** at [Boots](https://boots.test/serum)"));
    assert!(!first.contains("Amazon"));

    // Small wobbles inside the band stay quiet.
    extractor.set(BOOTS_SUN, "84");
    extractor.set(BOOTS_SERUM, "31");

    let report = runner.run_cycle().await?;
    assert_eq!(report.notified_products, 0);
    assert!(!report.alert_sent);
    assert_eq!(notifier.messages().len(), 1);

    let snapshot = store.get_all().await?;
    assert_eq!(snapshot[&CacheKey::new("Boots", "Sun Cream")], d("84"));
    assert_eq!(snapshot[&CacheKey::new("Boots", "Serum")], d("31"));

    // A large move re-alerts for that product only.
    extractor.set(BOOTS_SUN, "70");

    let report = runner.run_cycle().await?;
    assert_eq!(report.notified_products, 1);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 2);
    let third = &messages[1];
    assert!(third.contains("Best price: **£70.00** at [Boots](https://boots.test/sun)"));
    assert!(third.contains("30.00% off"));
    assert!(!third.contains("Serum"));
    assert!(!third.contains("Other prices"));

    Ok(())
}

#[tokio::test]
async fn test_crossing_below_threshold_alerts_inside_band() -> anyhow::Result<()> {
    let (_dir, store) = sqlite_store().await?;
    let extractor = Arc::new(ScriptedExtractor::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = runner(catalog(extractor.clone())?, store.clone(), notifier.clone())?;

    extractor.set(AMAZON_SUN, "95");
    let report = runner.run_cycle().await?;
    assert!(!report.alert_sent);

    // 89 is within 10% of the cached 95, but it is the first time the price
    // sits at or under the 90 threshold.
    extractor.set(AMAZON_SUN, "89");
    let report = runner.run_cycle().await?;
    assert!(report.alert_sent);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Best price: **£89.00** at [Amazon](https://amazon.test/sun)"));
    assert!(messages[0].contains("(-£11.00 | 11.00% off)"));

    Ok(())
}

#[tokio::test]
async fn test_failed_link_does_not_block_alert() -> anyhow::Result<()> {
    let (_dir, store) = sqlite_store().await?;
    let extractor = Arc::new(ScriptedExtractor::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = runner(catalog(extractor.clone())?, store.clone(), notifier.clone())?;

    extractor.set(BOOTS_SUN, "80");
    extractor.remove(AMAZON_SUN);

    let report = runner.run_cycle().await?;
    assert_eq!(report.links_checked, 3);
    assert_eq!(report.observations, 1);
    assert_eq!(report.failures, 2);
    assert_eq!(report.notified_products, 1);
    assert!(report.alert_sent);

    let messages = notifier.messages();
    assert!(messages[0].contains("**Sun Cream**"));
    assert!(messages[0].contains("[Boots](https://boots.test/sun)"));
    assert!(!messages[0].contains("Amazon"));

    let snapshot = store.get_all().await?;
    assert_eq!(snapshot.len(), 1);
    assert!(!snapshot.contains_key(&CacheKey::new("Amazon", "Sun Cream")));

    Ok(())
}

#[tokio::test]
async fn test_cache_survives_restart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let url = database_url(&dir);
    let extractor = Arc::new(ScriptedExtractor::default());
    extractor.set(BOOTS_SUN, "85");

    {
        let store = Arc::new(SqlitePriceStore::connect(&url).await?);
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner(catalog(extractor.clone())?, store.clone(), notifier.clone())?;
        assert!(runner.run_cycle().await?.alert_sent);
        store.close().await;
    }

    let store = Arc::new(SqlitePriceStore::connect(&url).await?);
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = runner(catalog(extractor.clone())?, store, notifier.clone())?;

    let report = runner.run_cycle().await?;
    assert!(!report.alert_sent);
    assert!(notifier.messages().is_empty());

    Ok(())
}
