use chrono::SecondsFormat;

use crate::store::entities::Store;

use super::seconds_rounded;

pub const EXPORT_FILE_NAME: &str = "screentime-export.csv";

const HEADER: [&str; 5] = [
    "date",
    "total_seconds",
    "session_start",
    "session_end",
    "session_seconds",
];

/// Builds the export document: one row per session across all days, day keys
/// ascending. A day with no sessions still emits one row carrying its total
/// with blank session fields. Seconds for a session are only computed when
/// both ends are present; an open session leaves the column blank.
pub fn build_csv(store: &Store) -> String {
    let mut rows = vec![HEADER.iter().map(|v| v.to_string()).collect::<Vec<_>>()];

    for (day, record) in store.days() {
        let total = seconds_rounded(record.total_ms).to_string();
        if record.sessions.is_empty() {
            rows.push(vec![
                day.to_string(),
                total,
                String::new(),
                String::new(),
                String::new(),
            ]);
            continue;
        }
        for session in &record.sessions {
            let start = session.start.to_rfc3339_opts(SecondsFormat::Millis, true);
            let end = session
                .end
                .map(|e| e.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_default();
            let seconds = session
                .duration_ms()
                .map(|ms| seconds_rounded(ms).to_string())
                .unwrap_or_default();
            rows.push(vec![day.to_string(), total.clone(), start, end, seconds]);
        }
    }

    rows.iter()
        .map(|row| {
            row.iter()
                .map(|field| quote(field))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
