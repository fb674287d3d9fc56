//! The dashboard: a pure read path over the store and the engine's live
//! state, repainted once per second. Nothing in here mutates persisted data.

pub mod chart;

use std::io::Write as _;

use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    metrics::{format_duration, goal_percent, minutes_rounded, today_total, weekly_minutes},
    store::{
        adapter::StoreAdapter,
        entities::{DayRecord, Store},
    },
    tracker::engine::DashboardState,
    utils::{clock::Clock, time::day_key},
};

use chart::{bar, meter, week_scale};

const RENDER_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);
const METER_WIDTH: usize = 30;
const WEEK_BAR_WIDTH: usize = 30;
const PREVIEW_SESSIONS: usize = 3;

/// Which panels get painted. Disabling one is a capability decision, never an
/// error.
#[derive(Debug, Clone, Copy)]
pub struct DashboardPanels {
    pub summary: bool,
    pub progress: bool,
    pub sessions: bool,
    pub week: bool,
    /// The command hint line only makes sense while a watch session is
    /// reading stdin.
    pub hints: bool,
}

impl Default for DashboardPanels {
    fn default() -> Self {
        Self {
            summary: true,
            progress: true,
            sessions: true,
            week: true,
            hints: true,
        }
    }
}

/// Repaints the terminal from the persisted store plus the engine's live
/// state. Purely presentational; it owns no state of its own.
pub struct Dashboard<A: StoreAdapter> {
    adapter: A,
    state: watch::Receiver<DashboardState>,
    goal_minutes: u32,
    panels: DashboardPanels,
    clock: Box<dyn Clock>,
}

impl<A: StoreAdapter> Dashboard<A> {
    pub fn new(
        adapter: A,
        state: watch::Receiver<DashboardState>,
        goal_minutes: u32,
        panels: DashboardPanels,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            adapter,
            state,
            goal_minutes,
            panels,
            clock,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let mut tick = self.clock.instant();
        loop {
            tick += RENDER_INTERVAL;

            let store = self.adapter.load().await;
            let state = self.state.borrow().clone();
            let frame = render_frame(
                &store,
                &state,
                self.clock.now(),
                self.goal_minutes,
                &self.panels,
            );

            let mut stdout = std::io::stdout();
            // Clear, then repaint from the top left.
            write!(stdout, "\x1b[2J\x1b[H{frame}")?;
            stdout.flush()?;

            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                _ = self.clock.sleep_until(tick) => (),
            }
        }
    }
}

/// Builds one dashboard frame as a function of store and transient state.
pub fn render_frame(
    store: &Store,
    state: &DashboardState,
    now: DateTime<FixedOffset>,
    goal_minutes: u32,
    panels: &DashboardPanels,
) -> String {
    let today = now.date_naive();
    let empty = DayRecord::default();
    let record = store.day(&day_key(today)).unwrap_or(&empty);
    let total = today_total(store, today, state.ledger.active_start, now.to_utc());

    let mut out = String::new();

    let status = if state.ledger.paused {
        Colour::Yellow.paint("paused")
    } else if state.ledger.active_start.is_some() {
        Colour::Green.paint("tracking")
    } else {
        Style::new().dimmed().paint("idle")
    };
    out.push_str(&format!(
        "{} [{status}]\n",
        Style::new().bold().paint("screentime")
    ));

    if panels.summary {
        out.push_str(&format!(
            "\nToday {}\n{}\n",
            Colour::Cyan.bold().paint(format_duration(total)),
            session_preview(record, now)
        ));
    }

    if panels.progress {
        let percent = goal_percent(total, goal_minutes);
        out.push_str(&format!(
            "\n{} min of {} min goal\n[{}] {percent:>3}%\n",
            minutes_rounded(total),
            goal_minutes,
            Colour::Purple.paint(meter(percent, METER_WIDTH)),
        ));
    }

    if panels.week {
        out.push_str(&format!("\n{}\n", Style::new().bold().paint("Last 7 days")));
        let week = weekly_minutes(store, today);
        let scale = week_scale(&week.iter().map(|(_, minutes)| *minutes).collect::<Vec<_>>());
        for (label, minutes) in &week {
            out.push_str(&format!(
                "{label}  {} {minutes:>4}m\n",
                Colour::Blue.paint(bar(*minutes, scale, WEEK_BAR_WIDTH))
            ));
        }
    }

    if panels.sessions {
        out.push_str(&format!("\n{}\n", Style::new().bold().paint("Sessions")));
        if record.sessions.is_empty() {
            out.push_str("No sessions recorded yet. Keep this window open to begin tracking.\n");
        } else {
            for session in record.sessions.iter().rev() {
                let start = session.start.with_timezone(now.offset()).format("%H:%M:%S");
                let (end, duration_ms) = match session.end {
                    Some(end) => (
                        end.with_timezone(now.offset()).format("%H:%M:%S").to_string(),
                        (end - session.start).num_milliseconds(),
                    ),
                    None => (
                        "active".to_string(),
                        (now.to_utc() - session.start).num_milliseconds(),
                    ),
                };
                out.push_str(&format!(
                    "{start} → {end:<8}  {}\n",
                    format_duration(duration_ms)
                ));
            }
        }
    }

    if let Some(notice) = &state.notice {
        out.push_str(&format!("\n{}\n", Style::new().dimmed().paint(notice.as_str())));
    }

    if panels.hints {
        out.push_str(&format!(
            "\n{}\n",
            Style::new()
                .dimmed()
                .paint("commands: pause • resume • reset • export • quit")
        ));
    }

    out
}

/// The last few sessions on one line, most recent first.
fn session_preview(record: &DayRecord, now: DateTime<FixedOffset>) -> String {
    if record.sessions.is_empty() {
        return "No sessions yet. Tracking starts while this terminal stays active.".to_string();
    }
    record
        .sessions
        .iter()
        .rev()
        .take(PREVIEW_SESSIONS)
        .map(|session| {
            let start = session.start.with_timezone(now.offset()).format("%H:%M:%S");
            match session.end {
                Some(end) => format!(
                    "{start} → {}",
                    end.with_timezone(now.offset()).format("%H:%M:%S")
                ),
                None => format!("{start} → active"),
            }
        })
        .collect::<Vec<_>>()
        .join(" • ")
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, FixedOffset, TimeZone};

    use crate::{
        store::entities::Store,
        tracker::{engine::DashboardState, ledger::LedgerSnapshot},
    };

    use super::{DashboardPanels, render_frame, session_preview};

    fn noon() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2018, 7, 4, 12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_empty_store_frame() {
        let frame = render_frame(
            &Store::default(),
            &DashboardState::default(),
            noon(),
            480,
            &DashboardPanels::default(),
        );
        assert!(frame.contains("00:00:00"));
        assert!(frame.contains("No sessions yet"));
        assert!(frame.contains("No sessions recorded yet"));
        assert!(frame.contains("0 min of 480 min goal"));
        assert!(frame.contains("Last 7 days"));
    }

    #[test]
    fn test_live_session_contributes_to_total() {
        let now = noon();
        let start = (now - Duration::seconds(10)).to_utc();
        let mut store = Store::default();
        store.day_mut("2018-07-04").begin_session(start);
        let state = DashboardState {
            ledger: LedgerSnapshot {
                active_start: Some(start),
                paused: false,
            },
            notice: None,
        };

        let frame = render_frame(&store, &state, now, 480, &DashboardPanels::default());
        assert!(frame.contains("00:00:10"));
        assert!(frame.contains("tracking"));
        assert!(frame.contains("active"));
    }

    #[test]
    fn test_goal_percent_renders() {
        let mut store = Store::default();
        store.day_mut("2018-07-04").total_ms = 240 * 60_000;

        let frame = render_frame(
            &store,
            &DashboardState::default(),
            noon(),
            480,
            &DashboardPanels::default(),
        );
        assert!(frame.contains("240 min of 480 min goal"));
        assert!(frame.contains(" 50%"));
    }

    #[test]
    fn test_disabled_panels_are_skipped() {
        let panels = DashboardPanels {
            summary: false,
            progress: false,
            sessions: false,
            week: false,
            hints: false,
        };
        let frame = render_frame(
            &Store::default(),
            &DashboardState::default(),
            noon(),
            480,
            &panels,
        );
        assert!(!frame.contains("Sessions"));
        assert!(!frame.contains("Last 7 days"));
        assert!(!frame.contains("commands:"));
    }

    #[test]
    fn test_preview_keeps_most_recent_three() {
        let now = noon();
        let mut store = Store::default();
        let record = store.day_mut("2018-07-04");
        for hour in 6..10 {
            let start = now.to_utc() - Duration::hours(12 - hour);
            record.record_closed(start, start + Duration::minutes(5));
        }

        let preview = session_preview(store.day("2018-07-04").unwrap(), now);
        assert_eq!(preview.matches("→").count(), 3);
        // most recent first
        assert!(preview.starts_with("09:00:00"));
    }

    #[test]
    fn test_notice_is_shown() {
        let state = DashboardState {
            ledger: LedgerSnapshot::default(),
            notice: Some("Today reset".into()),
        };
        let frame = render_frame(
            &Store::default(),
            &state,
            noon(),
            480,
            &DashboardPanels::default(),
        );
        assert!(frame.contains("Today reset"));
    }
}
