//! Background low-stock monitor.
//!
//! Periodically looks for items at or below their reorder level that have not
//! been alerted in their current low-stock episode, and raises one alert each.
//! Catches stock that went low through a raised reorder level or a direct
//! database edit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info};

use crate::database::DatabaseConnection;
use crate::error::ApiResult;

pub struct StockMonitor {
    db: Arc<DatabaseConnection>,
    period: Duration,
}

impl StockMonitor {
    pub fn new(db: Arc<DatabaseConnection>, period: Duration) -> Self {
        Self { db, period }
    }

    /// Runs until `shutdown` flips to true or its sender is dropped
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Stock monitor running every {:?}", self.period);
            // First scan waits one full period so start-up stays quick
            let mut timer = interval_at(Instant::now() + self.period, self.period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        match self.scan().await {
                            Ok(0) => debug!("Stock scan found nothing new"),
                            Ok(written) => info!("Stock scan wrote {} low-stock notifications", written),
                            Err(e) => error!("Stock scan failed: {}", e),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Stock monitor stopped");
        })
    }

    /// One pass; returns the number of notification rows written
    pub async fn scan(&self) -> ApiResult<u64> {
        let items = self.db.unalerted_low_stock().await?;
        if items.is_empty() {
            return Ok(0);
        }
        self.db.raise_low_stock_alerts(&items).await
    }
}
