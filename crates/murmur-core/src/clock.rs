use chrono::{DateTime, NaiveDateTime, Utc};

pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current UTC wall clock in the cross-tier `createTime` format.
pub fn now_date_time() -> String {
    Utc::now().format(DATE_TIME_FORMAT).to_string()
}

pub fn format_date_time(ts: DateTime<Utc>) -> String {
    ts.format(DATE_TIME_FORMAT).to_string()
}

pub fn parse_date_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let now = now_date_time();
        let parsed = parse_date_time(&now).expect("parse own output");
        assert_eq!(format_date_time(parsed), now);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_date_time("not a date").is_none());
    }
}
