use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{focus_api::FocusSample, metrics::csv::build_csv, store::adapter::StoreAdapter};

use super::{
    idle::IdleEvaluator,
    ledger::{LedgerSnapshot, SessionLedger},
};

/// User actions arriving from the console, the analog of the widget buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Pause,
    Resume,
    ResetToday,
    Export,
    Quit,
}

/// State published to the dashboard after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardState {
    pub ledger: LedgerSnapshot,
    /// Transient feedback about the last user action.
    pub notice: Option<String>,
}

/// Drives the session ledger from focus samples and user commands.
pub struct TrackingEngine<A: StoreAdapter> {
    events: mpsc::Receiver<FocusSample>,
    controls: mpsc::Receiver<ControlCommand>,
    ledger: SessionLedger<A>,
    idle_evaluator: IdleEvaluator,
    exporter: A,
    export_path: PathBuf,
    state: watch::Sender<DashboardState>,
    shutdown: CancellationToken,
    last_sample: FocusSample,
    controls_open: bool,
}

impl<A: StoreAdapter> TrackingEngine<A> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: mpsc::Receiver<FocusSample>,
        controls: mpsc::Receiver<ControlCommand>,
        ledger: SessionLedger<A>,
        idle_evaluator: IdleEvaluator,
        exporter: A,
        export_path: PathBuf,
        state: watch::Sender<DashboardState>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            events,
            controls,
            ledger,
            idle_evaluator,
            exporter,
            export_path,
            state,
            shutdown,
            last_sample: FocusSample {
                focused: false,
                idle_ms: 0,
            },
            controls_open: true,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(sample) => {
                        debug!("Processing sample {sample:?}");
                        self.last_sample = sample;
                        if let Err(e) = self.evaluate(None).await {
                            error!("Error applying sample {sample:?}: {e:?}");
                        }
                    }
                    // Sampler is gone, nothing drives sessions anymore.
                    None => break,
                },
                command = self.controls.recv(), if self.controls_open => match command {
                    Some(command) => {
                        if let Err(e) = self.handle(command).await {
                            error!("Error handling command {command:?}: {e:?}");
                        }
                    }
                    None => self.controls_open = false,
                },
            }
        }

        // The unload flush: close any open session before the process goes away.
        self.ledger.stop().await?;
        self.publish(None);
        Ok(())
    }

    /// The transition rule: a session must be open exactly when the user is
    /// present, focused and not paused. Start and stop are no-ops in the
    /// target state, so this runs unconditionally on every signal.
    async fn evaluate(&mut self, notice: Option<String>) -> Result<()> {
        let present = !self.idle_evaluator.is_idle(self.last_sample.idle_ms);
        if !self.ledger.is_paused() && present && self.last_sample.focused {
            self.ledger.start().await?;
        } else {
            self.ledger.stop().await?;
        }
        self.publish(notice);
        Ok(())
    }

    async fn handle(&mut self, command: ControlCommand) -> Result<()> {
        match command {
            ControlCommand::Pause => {
                self.ledger.set_paused(true).await?;
                self.publish(Some("Tracking paused".into()));
            }
            ControlCommand::Resume => {
                self.ledger.set_paused(false).await?;
                self.evaluate(Some("Tracking resumed".into())).await?;
            }
            ControlCommand::ResetToday => {
                self.ledger.reset_today().await?;
                self.publish(Some("Today reset".into()));
            }
            ControlCommand::Export => {
                let store = self.exporter.load().await;
                tokio::fs::write(&self.export_path, build_csv(&store)).await?;
                info!("Exported csv to {:?}", self.export_path);
                self.publish(Some(format!("CSV written to {}", self.export_path.display())));
            }
            ControlCommand::Quit => self.shutdown.cancel(),
        }
        Ok(())
    }

    /// Pushes the current ledger view to the dashboard. A notice replaces the
    /// previous one; plain state updates leave it on screen.
    fn publish(&self, notice: Option<String>) {
        self.state.send_modify(|state| {
            state.ledger = self.ledger.snapshot();
            if notice.is_some() {
                state.notice = notice;
            }
        });
    }
}
