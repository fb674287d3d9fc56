//! Read-only derivations over the persisted store: formatted durations,
//! live totals, weekly aggregates and the CSV export document.

pub mod csv;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    store::entities::Store,
    utils::time::{day_key, week_ending},
};

/// Formats milliseconds as `HH:MM:SS`. Hours are not wrapped at 24; negative
/// input renders as zero.
pub fn format_duration(ms: i64) -> String {
    let ms = ms.max(0);
    let sec = ms / 1000 % 60;
    let min = ms / 60_000 % 60;
    let hrs = ms / 3_600_000;
    format!("{hrs:02}:{min:02}:{sec:02}")
}

/// Milliseconds rounded half-up to whole minutes.
pub fn minutes_rounded(ms: i64) -> i64 {
    (ms.max(0) + 30_000) / 60_000
}

/// Milliseconds rounded half-up to whole seconds.
pub fn seconds_rounded(ms: i64) -> i64 {
    (ms.max(0) + 500) / 1000
}

/// Today's persisted total plus, if a session is currently open, the elapsed
/// time since its start that has not been flushed to the store yet.
pub fn today_total(
    store: &Store,
    today: NaiveDate,
    active_start: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    let persisted = store.day(&day_key(today)).map(|r| r.total_ms).unwrap_or(0);
    let live = active_start
        .map(|start| (now - start).num_milliseconds().max(0))
        .unwrap_or(0);
    persisted + live
}

/// Minutes per day for the 7 calendar days ending `today`, oldest first,
/// labeled `MM-DD`. Days with no record contribute zero.
pub fn weekly_minutes(store: &Store, today: NaiveDate) -> Vec<(String, i64)> {
    week_ending(today)
        .map(|day| {
            let minutes = store
                .day(&day_key(day))
                .map(|r| minutes_rounded(r.total_ms))
                .unwrap_or(0);
            (day.format("%m-%d").to_string(), minutes)
        })
        .collect()
}

/// Percent of the daily goal reached, capped at 100.
pub fn goal_percent(total_ms: i64, goal_minutes: u32) -> u32 {
    let minutes = minutes_rounded(total_ms);
    let goal = i64::from(goal_minutes.max(1));
    ((minutes * 100 + goal / 2) / goal).clamp(0, 100) as u32
}
