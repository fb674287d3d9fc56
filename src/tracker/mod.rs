use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::{
    focus_api::{FocusMonitor, FocusSample, GenericFocusMonitor},
    render::{Dashboard, DashboardPanels},
    store::{STORE_FILE_NAME, adapter::JsonStoreAdapter},
    utils::clock::{Clock, DefaultClock},
};

use self::{
    control::listen_for_commands,
    engine::{ControlCommand, DashboardState, TrackingEngine},
    idle::IdleEvaluator,
    ledger::SessionLedger,
    sampler::FocusSampler,
};

pub mod control;
pub mod engine;
pub mod idle;
pub mod ledger;
pub mod sampler;
pub mod shutdown;

const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Runtime knobs for a watch run, filled in by the cli surface.
pub struct WatchOptions {
    pub goal_minutes: u32,
    pub idle_timeout_s: u32,
    pub start_paused: bool,
    pub export_path: PathBuf,
    pub panels: DashboardPanels,
}

/// Represents the starting point for a watch run. Wires the focus sampler,
/// the tracking engine, the console command listener and the dashboard
/// together and runs them until shutdown.
pub async fn start_watch(dir: PathBuf, options: WatchOptions) -> Result<()> {
    let adapter = Arc::new(JsonStoreAdapter::new(dir.join(STORE_FILE_NAME))?);
    let monitor = GenericFocusMonitor::new()?;

    let shutdown_token = CancellationToken::new();

    let (sample_sender, sample_receiver) = mpsc::channel::<FocusSample>(10);
    let (control_sender, control_receiver) = mpsc::channel::<ControlCommand>(10);
    let (state_sender, state_receiver) = watch::channel(DashboardState::default());

    let sampler = create_sampler(sample_sender, Box::new(monitor), &shutdown_token, DefaultClock);

    let engine = create_engine(
        adapter.clone(),
        sample_receiver,
        control_receiver,
        state_sender,
        &shutdown_token,
        &options,
        DefaultClock,
    );

    let dashboard = Dashboard::new(
        adapter,
        state_receiver,
        options.goal_minutes,
        options.panels,
        Box::new(DefaultClock),
    );

    let (_, _, sampler_result, engine_result, dashboard_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        listen_for_commands(control_sender, shutdown_token.clone()),
        sampler.run(),
        engine.run(),
        dashboard.run(shutdown_token.clone()),
    );

    if let Err(sampler_result) = sampler_result {
        error!("Sampler module got an error {:?}", sampler_result);
    }

    if let Err(engine_result) = engine_result {
        error!("Engine module got an error {:?}", engine_result);
    }

    if let Err(dashboard_result) = dashboard_result {
        error!("Dashboard module got an error {:?}", dashboard_result);
    }

    Ok(())
}

fn create_sampler(
    sender: mpsc::Sender<FocusSample>,
    monitor: Box<dyn FocusMonitor>,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> FocusSampler {
    FocusSampler::new(
        sender,
        monitor,
        shutdown_token.clone(),
        SAMPLE_INTERVAL,
        Box::new(clock),
    )
}

fn create_engine(
    adapter: Arc<JsonStoreAdapter>,
    samples: mpsc::Receiver<FocusSample>,
    controls: mpsc::Receiver<ControlCommand>,
    state: watch::Sender<DashboardState>,
    shutdown_token: &CancellationToken,
    options: &WatchOptions,
    clock: impl Clock,
) -> TrackingEngine<Arc<JsonStoreAdapter>> {
    let ledger = SessionLedger::new(adapter.clone(), Box::new(clock), options.start_paused);
    TrackingEngine::new(
        samples,
        controls,
        ledger,
        IdleEvaluator::from_seconds(options.idle_timeout_s),
        adapter,
        options.export_path.clone(),
        state,
        shutdown_token.clone(),
    )
}

#[cfg(test)]
mod tracker_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{DateTime, FixedOffset, TimeZone};
    use tempfile::tempdir;
    use tokio::{
        sync::{mpsc, watch},
        time::Instant,
    };
    use tokio_util::sync::CancellationToken;

    use crate::{
        focus_api::{FocusSample, MockFocusMonitor},
        render::DashboardPanels,
        store::{STORE_FILE_NAME, adapter::{JsonStoreAdapter, StoreAdapter}},
        tracker::{
            WatchOptions, create_engine, create_sampler,
            engine::{ControlCommand, DashboardState},
        },
        utils::{clock::Clock, logging::TEST_LOGGING},
    };

    #[derive(Clone)]
    struct TestClock {
        start_time: DateTime<FixedOffset>,
        reference: Instant,
    }

    impl TestClock {
        fn new() -> Self {
            Self {
                start_time: FixedOffset::east_opt(0)
                    .unwrap()
                    .with_ymd_and_hms(2018, 7, 4, 12, 0, 0)
                    .unwrap(),
                reference: Instant::now(),
            }
        }
    }

    #[async_trait]
    impl Clock for TestClock {
        fn now(&self) -> DateTime<FixedOffset> {
            self.start_time + chrono::Duration::from_std(self.reference.elapsed()).unwrap()
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep(&self, duration: Duration) {
            tokio::time::sleep(duration).await;
        }

        async fn sleep_until(&self, instant: tokio::time::Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }

    fn focused_monitor() -> MockFocusMonitor {
        let mut monitor = MockFocusMonitor::new();
        monitor.expect_sample().returning(|| {
            Ok(FocusSample {
                focused: true,
                idle_ms: 0,
            })
        });
        monitor
    }

    fn test_options(export_path: std::path::PathBuf) -> WatchOptions {
        WatchOptions {
            goal_minutes: 480,
            idle_timeout_s: 120,
            start_paused: false,
            export_path,
            panels: DashboardPanels::default(),
        }
    }

    /// Very simple smoke test to check if sampling, evaluation and the
    /// shutdown flush work together against a real store file.
    #[tokio::test]
    async fn smoke_test_watch_records_a_session() -> Result<()> {
        *TEST_LOGGING;

        let dir = tempdir()?;
        let adapter = Arc::new(JsonStoreAdapter::new(dir.path().join(STORE_FILE_NAME))?);
        let shutdown_token = CancellationToken::new();

        let (sample_sender, sample_receiver) = mpsc::channel(10);
        let (_control_sender, control_receiver) = mpsc::channel(10);
        let (state_sender, state_receiver) = watch::channel(DashboardState::default());

        let test_clock = TestClock::new();
        let sampler = create_sampler(
            sample_sender,
            Box::new(focused_monitor()),
            &shutdown_token,
            test_clock.clone(),
        );
        let engine = create_engine(
            adapter.clone(),
            sample_receiver,
            control_receiver,
            state_sender,
            &shutdown_token,
            &test_options(dir.path().join("export.csv")),
            test_clock.clone(),
        );

        let (_, sampler_result, engine_result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(2500)).await;
                shutdown_token.cancel()
            },
            sampler.run(),
            engine.run(),
        );
        sampler_result?;
        engine_result?;

        assert!(state_receiver.borrow().ledger.active_start.is_none());

        let store = adapter.load().await;
        let record = store.day("2018-07-04").expect("today should be recorded");
        assert_eq!(record.sessions.len(), 1);
        assert!(!record.sessions[0].is_open());
        assert!(record.total_ms >= 1000);
        Ok(())
    }

    #[tokio::test]
    async fn smoke_test_pause_command_closes_the_session() -> Result<()> {
        *TEST_LOGGING;

        let dir = tempdir()?;
        let adapter = Arc::new(JsonStoreAdapter::new(dir.path().join(STORE_FILE_NAME))?);
        let shutdown_token = CancellationToken::new();

        let (sample_sender, sample_receiver) = mpsc::channel(10);
        let (control_sender, control_receiver) = mpsc::channel(10);
        let (state_sender, state_receiver) = watch::channel(DashboardState::default());

        let test_clock = TestClock::new();
        let sampler = create_sampler(
            sample_sender,
            Box::new(focused_monitor()),
            &shutdown_token,
            test_clock.clone(),
        );
        let engine = create_engine(
            adapter.clone(),
            sample_receiver,
            control_receiver,
            state_sender,
            &shutdown_token,
            &test_options(dir.path().join("export.csv")),
            test_clock.clone(),
        );

        let (_, sampler_result, engine_result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(1200)).await;
                control_sender.send(ControlCommand::Pause).await.unwrap();
                tokio::time::sleep(Duration::from_millis(1200)).await;
                shutdown_token.cancel()
            },
            sampler.run(),
            engine.run(),
        );
        sampler_result?;
        engine_result?;

        assert!(state_receiver.borrow().ledger.paused);

        let store = adapter.load().await;
        let record = store.day("2018-07-04").expect("today should be recorded");
        // Pausing closed the session; later samples must not reopen it.
        assert_eq!(record.sessions.len(), 1);
        assert!(!record.sessions[0].is_open());
        Ok(())
    }
}
