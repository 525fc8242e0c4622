//! Poller: refreshes the fleet snapshot from the store on a fixed interval

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::state::{reduce_latest, FleetSnapshot, StateHandle};
use crate::store::Store;

/// Errors in a row before the poller raises a warning
const ERROR_WARN_THRESHOLD: u32 = 5;

pub struct Poller {
    store: Arc<dyn Store>,
    state: StateHandle,
    interval: Duration,
    latest_limit: usize,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(
        store: Arc<dyn Store>,
        state: StateHandle,
        interval: Duration,
        latest_limit: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            state,
            interval,
            latest_limit,
            cancel,
        }
    }

    /// Read the store once and update the shared snapshot
    pub async fn poll_once(&self) -> crate::Result<usize> {
        let now = Utc::now();
        let fetched = async {
            let rows = self.store.latest_telemetry(self.latest_limit).await?;
            let devices = self.store.list_devices().await?;
            crate::Result::Ok((rows, devices))
        }
        .await;

        let mut state = self.state.write().await;
        match fetched {
            Ok((rows, devices)) => {
                let balloons = reduce_latest(&rows, &devices);
                let count = balloons.len();
                tracing::debug!("Poll read {} rows, {} balloons", rows.len(), count);
                state.record_success(
                    FleetSnapshot {
                        balloons,
                        taken_at: Some(now),
                    },
                    now,
                );
                Ok(count)
            }
            Err(e) => {
                let errors = state.record_failure(e.to_string(), now);
                if errors == ERROR_WARN_THRESHOLD {
                    tracing::warn!("Fleet poll has {} consecutive errors: {}", errors, e);
                } else {
                    tracing::debug!("Fleet poll failed ({} in a row): {}", errors, e);
                }
                Err(e)
            }
        }
    }

    /// Poll until the cancellation token is triggered
    pub async fn run(&self) {
        tracing::info!(
            "Fleet poller started, interval {}",
            humantime::format_duration(self.interval)
        );
        loop {
            let _ = self.poll_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Fleet poller cancelled");
                    break;
                }
            }
        }
    }
}
