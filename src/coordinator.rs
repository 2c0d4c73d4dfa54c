use crate::api::ObiApi;
use crate::model::FetchResult;
use chrono::Utc;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const SCAN_INTERVAL: Duration = Duration::from_secs(300);
pub const DAYS_OF_HISTORY: u32 = 7;

/// A refresh cycle failed, carries the text of the underlying error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFailed(pub String);

impl fmt::Display for UpdateFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to update data: {}", self.0)
    }
}

impl std::error::Error for UpdateFailed {}

/// Periodically fetches meter and hourly data and keeps the last successful result.
pub struct Coordinator {
    api: ObiApi,
    data: RwLock<Option<Arc<FetchResult>>>,
    last_update_success: AtomicBool,
}

impl Coordinator {
    pub fn new(api: ObiApi) -> Coordinator {
        Coordinator {
            api,
            data: RwLock::new(None),
            last_update_success: AtomicBool::new(false),
        }
    }

    pub fn api(&self) -> &ObiApi {
        &self.api
    }

    /// Last successfully fetched result, `None` before the first successful cycle.
    pub fn data(&self) -> Option<Arc<FetchResult>> {
        match self.data.read() {
            Ok(data) => data.clone(),
            Err(_) => {
                log::trace!("Unable to lock coordinator data");
                None
            }
        }
    }

    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::Relaxed)
    }

    /// One fetch cycle: meter reading first, then hourly data of the past days.
    pub async fn fetch(&self) -> Result<FetchResult, UpdateFailed> {
        let meter = self
            .api
            .try_meter_data()
            .await
            .map_err(|e| UpdateFailed(e.to_string()))?;
        log::debug!("Meter data: {:?}", meter);

        let hourly = self
            .api
            .try_hourly_data(Some(Utc::now().naive_utc()), DAYS_OF_HISTORY)
            .await
            .map_err(|e| UpdateFailed(e.to_string()))?;
        log::debug!(
            "Hourly data fetched: {}",
            if hourly.is_some() { "available" } else { "none" }
        );

        log::info!(
            "Successfully fetched data: meter={}, hourly_days={}",
            if meter.is_some() { "available" } else { "none" },
            DAYS_OF_HISTORY
        );

        Ok(FetchResult { hourly, meter })
    }

    /// Fetch and publish a new result. On failure the previous result stays in place.
    pub async fn refresh(&self) -> Result<(), UpdateFailed> {
        match self.fetch().await {
            Ok(result) => {
                if let Ok(mut data) = self.data.write() {
                    *data = Some(Arc::new(result));
                } else {
                    log::trace!("Unable to lock coordinator data, result dropped");
                }
                self.last_update_success.store(true, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                log::error!("{}", e);
                self.last_update_success.store(false, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Refresh every `interval`. A cycle always completes before the next one is scheduled.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        /* first tick completes immediately, setup already did the first refresh */
        ticker.tick().await;

        loop {
            ticker.tick().await;
            /* failures are logged by refresh(), next tick tries again */
            let _ = self.refresh().await;
        }
    }
}
