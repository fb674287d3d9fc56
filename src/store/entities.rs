use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

/// One continuous interval during which the user was present and focused.
/// `end` is absent while the session is still open.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct Session {
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl Session {
    pub fn open(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    pub fn closed(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end: Some(end.max(start)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Duration in milliseconds, known only once the session is closed.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end.map(|end| (end - self.start).num_milliseconds())
    }
}

/// The aggregate for one calendar date: accumulated total of completed
/// sessions plus the session list in chronological order.
///
/// Invariant: at most one session is open, and it is the last element.
/// [DayRecord::begin_session] enforces this on append, so readers never have
/// to scan for the open one.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DayRecord {
    pub total_ms: i64,
    pub sessions: Vec<Session>,
}

impl DayRecord {
    pub fn open_session(&self) -> Option<&Session> {
        self.sessions.last().filter(|s| s.is_open())
    }

    /// Appends a new open session. A stale open session can be left behind by
    /// a run that died before its shutdown flush; it gets sealed at its own
    /// start so no unverifiable time is credited.
    pub fn begin_session(&mut self, start: DateTime<Utc>) {
        for session in self.sessions.iter_mut().filter(|s| s.is_open()) {
            warn!("Sealing stale open session from {}", session.start);
            session.end = Some(session.start);
        }
        self.sessions.push(Session::open(start));
    }

    /// Closes the open session, if any. Returns whether one was closed.
    pub fn close_session(&mut self, end: DateTime<Utc>) -> bool {
        match self.sessions.last_mut() {
            Some(session) if session.is_open() => {
                session.end = Some(end.max(session.start));
                true
            }
            _ => false,
        }
    }

    pub fn record_closed(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.sessions.push(Session::closed(start, end));
    }
}

/// The full persisted mapping of day keys to [DayRecord]s. Days are never
/// evicted; a reset replaces one day with an empty record.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
#[serde(transparent)]
pub struct Store(pub BTreeMap<String, DayRecord>);

impl Store {
    pub fn day(&self, key: &str) -> Option<&DayRecord> {
        self.0.get(key)
    }

    pub fn day_mut(&mut self, key: &str) -> &mut DayRecord {
        self.0.entry(key.to_string()).or_default()
    }

    pub fn reset_day(&mut self, key: &str) {
        self.0.insert(key.to_string(), DayRecord::default());
    }

    pub fn days(&self) -> impl Iterator<Item = (&str, &DayRecord)> {
        self.0.iter().map(|(key, record)| (key.as_str(), record))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use super::{DayRecord, Session, Store};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    fn start_time() -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE)
    }

    #[test]
    fn test_serialized_layout_matches_store_format() {
        let mut store = Store::default();
        let record = store.day_mut("2018-07-04");
        record.begin_session(start_time());
        record.close_session(start_time() + Duration::seconds(5));
        record.total_ms = 5000;

        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(
            json,
            "{\"2018-07-04\":{\"totalMs\":5000,\"sessions\":\
             [{\"start\":\"2018-07-04T00:00:00Z\",\"end\":\"2018-07-04T00:00:05Z\"}]}}"
        );
    }

    #[test]
    fn test_reads_record_with_millisecond_timestamps_and_null_end() {
        let json = "{\"2024-01-05\":{\"totalMs\":61000,\"sessions\":[\
            {\"start\":\"2024-01-05T09:00:00.000Z\",\"end\":\"2024-01-05T09:01:01.000Z\"},\
            {\"start\":\"2024-01-05T10:00:00.000Z\",\"end\":null}]}}";
        let store: Store = serde_json::from_str(json).unwrap();
        let record = store.day("2024-01-05").unwrap();
        assert_eq!(record.total_ms, 61000);
        assert_eq!(record.sessions.len(), 2);
        assert_eq!(record.sessions[0].duration_ms(), Some(61000));
        assert!(record.sessions[1].is_open());
        assert!(record.open_session().is_some());
    }

    #[test]
    fn test_missing_fields_default() {
        let store: Store = serde_json::from_str("{\"2024-01-05\":{}}").unwrap();
        let record = store.day("2024-01-05").unwrap();
        assert_eq!(record.total_ms, 0);
        assert!(record.sessions.is_empty());
    }

    #[test]
    fn test_begin_session_seals_stale_open() {
        let mut record = DayRecord::default();
        record.begin_session(start_time());
        record.begin_session(start_time() + Duration::minutes(10));

        assert_eq!(record.sessions.len(), 2);
        assert_eq!(record.sessions[0].end, Some(start_time()));
        assert_eq!(record.sessions[0].duration_ms(), Some(0));
        assert_eq!(record.open_session().unwrap().start, start_time() + Duration::minutes(10));
    }

    #[test]
    fn test_close_session_without_open_is_noop() {
        let mut record = DayRecord::default();
        record.record_closed(start_time(), start_time() + Duration::seconds(1));

        assert!(!record.close_session(start_time() + Duration::seconds(2)));
        assert_eq!(record.sessions[0].end, Some(start_time() + Duration::seconds(1)));
    }

    #[test]
    fn test_close_session_clamps_end_to_start() {
        let mut record = DayRecord::default();
        record.begin_session(start_time());

        assert!(record.close_session(start_time() - Duration::seconds(5)));
        assert_eq!(record.sessions[0].end, Some(start_time()));
    }

    #[test]
    fn test_reset_day_keeps_other_days() {
        let mut store = Store::default();
        store.day_mut("2018-07-03").total_ms = 1000;
        store.day_mut("2018-07-04").total_ms = 2000;

        store.reset_day("2018-07-04");

        assert_eq!(store.day("2018-07-03").unwrap().total_ms, 1000);
        let today = store.day("2018-07-04").unwrap();
        assert_eq!(today.total_ms, 0);
        assert!(today.sessions.is_empty());
    }
}
