//! Periodic background refresh of lists shown to the user.

use crate::error::ApiError;
use futures::future::BoxFuture;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A background task that re-fetches something on a fixed period.
///
/// The first fetch happens immediately. Failed fetches are logged and the
/// task keeps going. The task stops on [`Refresher::stop`] or when the handle
/// is dropped.
pub struct Refresher {
    name: &'static str,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Refresher {
    pub fn spawn<T, F, S>(name: &'static str, period: Duration, fetch: F, mut sink: S) -> Self
    where
        T: Send + 'static,
        F: Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + 'static,
        S: FnMut(T) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let fetched = tokio::select! {
                    biased;
                    _ = task_cancel.cancelled() => break,
                    fetched = fetch() => fetched,
                };

                match fetched {
                    Ok(value) => sink(value),
                    Err(e) => warn!("Refreshing {} failed: {}", name, e),
                }
            }

            debug!("Refresh of {} stopped", name);
        });

        debug!("Refreshing {} every {:?}", name, period);
        Self {
            name,
            cancel,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop refreshing.
    pub fn stop(self) {
        self.cancel.cancel();
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
