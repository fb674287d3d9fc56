use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, info, warn};

use crate::{
    store::adapter::StoreAdapter,
    utils::{
        clock::Clock,
        time::{day_key, next_day_start},
    },
};

/// Read-only view of the transient tracking state, for display code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub active_start: Option<DateTime<Utc>>,
    pub paused: bool,
}

/// Owns the transient tracking state (`active_start`, `paused`) and every
/// mutation of the persisted store. The store is reloaded right before and
/// written back right after each mutation; completed data is never cached
/// across operations, so a second instance degrades to last-write-wins.
pub struct SessionLedger<A: StoreAdapter> {
    adapter: A,
    clock: Box<dyn Clock>,
    active_start: Option<DateTime<FixedOffset>>,
    paused: bool,
}

impl<A: StoreAdapter> SessionLedger<A> {
    pub fn new(adapter: A, clock: Box<dyn Clock>, start_paused: bool) -> Self {
        Self {
            adapter,
            clock,
            active_start: None,
            paused: start_paused,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_start.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            active_start: self.active_start.map(|v| v.to_utc()),
            paused: self.paused,
        }
    }

    /// Opens a new session under today's key. A no-op while paused or while a
    /// session is already open, so signal handlers can call it on every
    /// signal without tracking state themselves.
    pub async fn start(&mut self) -> Result<()> {
        if self.paused || self.active_start.is_some() {
            return Ok(());
        }
        let now = self.clock.now();
        self.active_start = Some(now);

        let mut store = self.adapter.load().await;
        store
            .day_mut(&day_key(now.date_naive()))
            .begin_session(now.to_utc());
        self.adapter.save(&store).await?;
        debug!("Opened session at {now}");
        Ok(())
    }

    /// Closes the open session and credits its duration. A session that
    /// crossed local midnight is split at each day boundary, so every day is
    /// credited exactly its own share.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(started) = self.active_start.take() else {
            return Ok(());
        };
        let mut now = self.clock.now();
        if now < started {
            warn!("Clock moved backwards during a session, clamping to its start");
            now = started;
        }

        let mut store = self.adapter.load().await;
        for (index, (seg_start, seg_end)) in split_local_days(started, now).into_iter().enumerate()
        {
            let record = store.day_mut(&day_key(seg_start.date_naive()));
            let closed = index == 0 && record.close_session(seg_end.to_utc());
            if !closed {
                // The open one is gone when the day was reset mid-session.
                record.record_closed(seg_start.to_utc(), seg_end.to_utc());
            }
            record.total_ms += (seg_end - seg_start).num_milliseconds();
        }
        self.adapter.save(&store).await?;
        debug!("Closed session {started} -> {now}");
        Ok(())
    }

    /// Pausing force-stops the open session. Resuming only lifts the flag;
    /// the caller re-evaluates the tracking condition to decide whether a new
    /// session opens.
    pub async fn set_paused(&mut self, paused: bool) -> Result<()> {
        self.paused = paused;
        if paused {
            self.stop().await?;
        }
        Ok(())
    }

    /// Replaces today's record with an empty one. Other days are untouched.
    pub async fn reset_today(&mut self) -> Result<()> {
        let today = self.clock.now().date_naive();
        let mut store = self.adapter.load().await;
        store.reset_day(&day_key(today));
        self.adapter.save(&store).await?;
        info!("Reset data for {today}");
        Ok(())
    }
}

/// Splits an interval into per-local-day segments at midnight boundaries.
fn split_local_days(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Vec<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let mut segments = vec![];
    let mut cursor = start;
    while cursor.date_naive() < end.date_naive() {
        let boundary = next_day_start(cursor);
        segments.push((cursor, boundary));
        cursor = boundary;
    }
    if cursor < end || segments.is_empty() {
        segments.push((cursor, end));
    }
    segments
}
