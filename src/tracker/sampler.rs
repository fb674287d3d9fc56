use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{
    focus_api::{FocusMonitor, FocusSample},
    utils::clock::Clock,
};

/// Polls the focus monitor on a fixed cadence and forwards samples to the
/// engine. This is the analog of the widget's visibility and focus events,
/// which a terminal process has to poll for itself.
pub struct FocusSampler {
    next: mpsc::Sender<FocusSample>,
    monitor: Box<dyn FocusMonitor>,
    shutdown: CancellationToken,
    sample_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl FocusSampler {
    pub fn new(
        next: mpsc::Sender<FocusSample>,
        monitor: Box<dyn FocusMonitor>,
        shutdown: CancellationToken,
        sample_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            monitor,
            shutdown,
            sample_interval,
            time_provider,
        }
    }

    /// Executes the sampler event loop. The first probe happens immediately,
    /// so the tracking condition is evaluated once at startup.
    pub async fn run(mut self) -> Result<()> {
        let mut collection_point = self.time_provider.instant();
        loop {
            collection_point += self.sample_interval;

            match self.monitor.sample() {
                Ok(sample) => {
                    debug!("Sending sample {:?}", sample);
                    self.next
                        .send(sample)
                        .await
                        .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
                }
                Err(e) => {
                    error!("Encountered an error during sampling {:?}", e)
                }
            }

            tokio::select! {
                // Cancelation means we stop execution of the event loop. Which means we also drop
                // the sender channel and consequently stop the engine.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(collection_point) => ()
            }
        }
    }
}
