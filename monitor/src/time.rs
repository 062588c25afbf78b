use chrono::{DateTime, Datelike, Local, SecondsFormat, Utc};

/// `YYYYMMDD` key used to name the day's artifacts.
pub fn date_key(now: &DateTime<Local>) -> String {
    format!("{:04}{:02}{:02}", now.year(), now.month(), now.day())
}

/// RFC 3339 in UTC, keeping whatever sub-second precision the value has.
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_ts(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc))
}
