use super::*;
use deal_watcher::{App, AppConfig};
use std::path::PathBuf;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(dir: &TempDir, contents: &str) -> anyhow::Result<PathBuf> {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents)?;
    Ok(path)
}

fn config_for(server: &MockServer, database: &str) -> String {
    format!(
        r#"
        [general]
        database = "{database}"
        min_discount = 0.1

        [scraper]
        max_concurrent_checks = 2
        request_timeout = 5

        [[retailers]]
        key = "boots"
        name = "Boots"
        selector = "div#PDP_productPrice"

        [[retailers]]
        key = "lookfantastic"
        name = "LookFantastic"
        selector = "div#product-price"
        child_selector = "span.text-gray-900"

        [[products]]
        name = "Sun Cream"
        base_price = 25
        category = "Skincare"
        links = {{ boots = "{uri}/boots/sun", lookfantastic = "{uri}/lf/sun" }}
        "#,
        uri = server.uri(),
    )
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_load_from_file() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;
    let path = write_config(&dir, &config_for(&server, "sqlite::memory:"))?;

    let config = AppConfig::load(&path)?;

    assert_eq!(config.retailers.len(), 2);
    assert_eq!(config.products[0].base_price, d("25"));
    assert_eq!(config.scraper.max_concurrent_checks, 2);
    assert_eq!(config.general.interval_secs, 3600);
    assert!(config.notifications.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_invalid_file_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_config(
        &dir,
        r#"
        [[products]]
        name = "Serum"
        base_price = 40
        links = { boots = "https://www.boots.com/serum" }
        "#,
    )?;

    let err = AppConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("unknown retailer 'boots'"));

    Ok(())
}

#[tokio::test]
async fn test_dry_run_cycle_over_http() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/boots/sun",
        r#"<html><body><div id="PDP_productPrice">£19.99</div></body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/lf/sun",
        r#"<html><body><div id="product-price"><span class="text-gray-900">£24.50</span></div></body></html>"#,
    )
    .await;

    let dir = tempfile::tempdir()?;
    let path = write_config(&dir, &config_for(&server, "sqlite::memory:"))?;
    let app = App::build(AppConfig::load(&path)?, true).await?;

    assert!(app.notifiers().has_notifier("console").await);

    let report = app.runner().run_cycle().await?;
    assert_eq!(report.links_checked, 2);
    assert_eq!(report.observations, 2);
    assert_eq!(report.failures, 0);
    assert_eq!(report.notified_products, 1);
    assert!(report.alert_sent);

    // Same prices again: nothing new to say.
    let report = app.runner().run_cycle().await?;
    assert!(!report.alert_sent);

    app.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_cycle_persists_to_configured_database() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/boots/sun",
        r#"<div id="PDP_productPrice">£20.00</div>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/lf/sun"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let database = database_url(&dir);
    let path = write_config(&dir, &config_for(&server, &database))?;

    let mut config = AppConfig::load(&path)?;
    assert_eq!(config.general.database, database);
    // Keep alerts on the console; only the store should be real.
    config.notifications = Default::default();

    let app = App::build(config, false).await?;
    let report = app.runner().run_cycle().await?;
    assert_eq!(report.observations, 1);
    assert_eq!(report.failures, 1);
    app.shutdown().await?;

    let store = SqlitePriceStore::connect(&database).await?;
    let entries = store.entries().await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key.retailer, "Boots");
    assert_eq!(entries[0].price_minor, 2000);

    Ok(())
}
