//! One scrape, filter, render, send and persist pass.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::filter::NotabilityFilter;
use crate::models::Catalog;
use crate::plugins::traits::NotifierPlugin;
use crate::render::AlertRenderer;
use crate::scraper::ScrapeOrchestrator;
use crate::store::PriceStore;
use crate::utils::error::AppError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub links_checked: usize,
    pub observations: usize,
    pub failures: usize,
    pub notified_products: usize,
    pub alert_sent: bool,
}

/// Something the scheduler can run once per tick.
#[async_trait]
pub trait CycleTask: Send + Sync {
    async fn run_cycle(&self) -> Result<CycleReport>;
}

pub struct CycleRunner {
    catalog: Arc<Catalog>,
    store: Arc<dyn PriceStore>,
    orchestrator: ScrapeOrchestrator,
    filter: NotabilityFilter,
    renderer: AlertRenderer,
    notifier: Arc<dyn NotifierPlugin>,
}

impl CycleRunner {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn PriceStore>,
        orchestrator: ScrapeOrchestrator,
        filter: NotabilityFilter,
        renderer: AlertRenderer,
        notifier: Arc<dyn NotifierPlugin>,
    ) -> Self {
        Self {
            catalog,
            store,
            orchestrator,
            filter,
            renderer,
            notifier,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run one cycle. Observed prices are persisted whether or not an alert
    /// went out. A failed send is reported only after that persist, and a
    /// failed persist after a successful send does not undo the send.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!("cycle", %cycle_id);

        let started = Instant::now();
        let result = self.execute(cycle_id).instrument(span).await;

        metrics::counter!("watcher_cycles_total").increment(1);
        metrics::histogram!("watcher_cycle_duration_seconds").record(started.elapsed().as_secs_f64());
        if result.is_err() {
            metrics::counter!("watcher_cycle_errors_total").increment(1);
        }

        result
    }

    async fn execute(&self, cycle_id: Uuid) -> Result<CycleReport> {
        tracing::info!(
            links = self.catalog.link_count(),
            min_discount = %self.filter.min_discount(),
            "Starting scrape"
        );

        let snapshot = self.store.get_all().await?;

        let outcome = self.orchestrator.run(&self.catalog, &snapshot).await;
        for failure in &outcome.failures {
            tracing::warn!(
                product = %self.catalog.product(failure.product).name,
                retailer = %self.catalog.retailer(failure.retailer).name,
                error = %failure.error,
                "Failed to get price"
            );
            metrics::counter!(
                "watcher_scrape_failures_total",
                "retailer" => self.catalog.retailer(failure.retailer).name.clone()
            )
            .increment(1);
        }
        metrics::counter!("watcher_links_checked_total").increment(self.catalog.link_count() as u64);

        let notifiable = self.filter.filter(&outcome.observations, &self.catalog);

        let send_result = if notifiable.is_empty() {
            tracing::info!("No prices found to notify");
            Ok(false)
        } else {
            tracing::info!(products = notifiable.len(), "Prices found to notify");
            let markdown = self.renderer.render(&notifiable, &self.catalog);
            self.notifier
                .send(&markdown)
                .await
                .map(|_| true)
                .map_err(|e| self.as_transport(e))
        };

        let records = outcome.price_records(&self.catalog, Utc::now());
        let persist_result = self.store.set_all(&records).await;

        let alert_sent = match (send_result, persist_result) {
            (Err(send_err), Err(persist_err)) => {
                tracing::error!(error = %persist_err, "Failed to persist prices after failed send");
                return Err(send_err);
            }
            (Err(send_err), Ok(())) => return Err(send_err),
            (Ok(_), Err(persist_err)) => return Err(persist_err),
            (Ok(sent), Ok(())) => sent,
        };

        if alert_sent {
            metrics::counter!("watcher_alerts_sent_total").increment(1);
        }

        let report = CycleReport {
            cycle_id,
            links_checked: self.catalog.link_count(),
            observations: outcome.observation_count(),
            failures: outcome.failures.len(),
            notified_products: notifiable.len(),
            alert_sent,
        };

        tracing::info!(
            observations = report.observations,
            failures = report.failures,
            notified_products = report.notified_products,
            "Cycle finished"
        );
        Ok(report)
    }

    fn as_transport(&self, err: AppError) -> AppError {
        match err {
            AppError::Transport { .. } => err,
            other => AppError::transport(self.notifier.plugin_type(), other),
        }
    }
}

#[async_trait]
impl CycleTask for CycleRunner {
    async fn run_cycle(&self) -> Result<CycleReport> {
        CycleRunner::run_cycle(self).await
    }
}
