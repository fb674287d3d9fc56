use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};

/// This is the standard way of converting a date to a store key in screentime.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    (date + Duration::days(1)).with_time(NaiveTime::MIN).unwrap()
}

/// The 7 calendar days ending with `today`, oldest first.
pub fn week_ending(today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (0..7).rev().map(move |back| today - Duration::days(back))
}
