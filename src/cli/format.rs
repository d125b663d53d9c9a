// src/cli/format.rs — Human-readable session lines

use chrono::{Local, TimeZone};

use crate::upstream::Session;

/// Epoch milliseconds as `YYYY-MM-DD HH:MM:SS` in the given zone.
pub fn format_timestamp<Tz: TimeZone>(ms: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match tz.timestamp_millis_opt(ms).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{ms}ms"),
    }
}

pub fn format_start_time(ms: i64) -> String {
    format_timestamp(ms, &Local)
}

/// Milliseconds as `HH:MM:SS`. Hours keep counting past 24.
pub fn format_duration(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    format!("{:02}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
}

pub fn session_line(s: &Session) -> String {
    let mut line = format!(
        "started {} | {} ({}) | {} | session {} | stream {} | duration {}",
        format_start_time(s.started_at_ms),
        s.owner_name,
        s.owner_id,
        s.title,
        s.session_id,
        s.stream_token,
        format_duration(s.duration_ms),
    );
    if s.cut_number != 0 {
        line.push_str(&format!(" | cut {}", s.cut_number));
    }
    line
}
