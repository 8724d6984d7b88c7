use chrono::{DateTime, Utc};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Convert a backend timestamp (nanoseconds since epoch) to a date-time
pub fn nanos_to_datetime(nanos: u64) -> DateTime<Utc> {
    let secs = (nanos / NANOS_PER_SEC) as i64;
    let subsec = (nanos % NANOS_PER_SEC) as u32;
    DateTime::<Utc>::from_timestamp(secs, subsec).unwrap_or_default()
}

/// Current time in milliseconds since epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a backend timestamp as "22 July 2025"
pub fn format_transaction_date(nanos: u64) -> String {
    nanos_to_datetime(nanos).format("%-d %B %Y").to_string()
}

/// Format a backend timestamp as 24-hour "14:30"
pub fn format_transaction_time(nanos: u64) -> String {
    nanos_to_datetime(nanos).format("%H:%M").to_string()
}

/// Relative time such as "2 hours ago", measured against `now`
pub fn format_relative_time_at(nanos: u64, now: DateTime<Utc>) -> String {
    let then = nanos_to_datetime(nanos);
    let diff = now.signed_duration_since(then);

    let plural = |n: i64, unit: &str| format!("{} {}{} ago", n, unit, if n > 1 { "s" } else { "" });

    match diff.num_seconds() {
        s if s < 60 => "Just now".to_string(),
        s if s < 3_600 => plural(s / 60, "minute"),
        s if s < 86_400 => plural(s / 3_600, "hour"),
        s => plural(s / 86_400, "day"),
    }
}

pub fn format_relative_time(nanos: u64) -> String {
    format_relative_time_at(nanos, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2025-07-22T14:30:00Z
    const SAMPLE_NANOS: u64 = 1_753_194_600 * NANOS_PER_SEC;

    #[test]
    fn test_transaction_date_and_time() {
        assert_eq!(format_transaction_date(SAMPLE_NANOS), "22 July 2025");
        assert_eq!(format_transaction_time(SAMPLE_NANOS), "14:30");
    }

    #[test]
    fn test_relative_time() {
        let now = nanos_to_datetime(SAMPLE_NANOS);
        assert_eq!(format_relative_time_at(SAMPLE_NANOS, now), "Just now");
        assert_eq!(
            format_relative_time_at(SAMPLE_NANOS - 120 * NANOS_PER_SEC, now),
            "2 minutes ago"
        );
        assert_eq!(
            format_relative_time_at(SAMPLE_NANOS - 3_600 * NANOS_PER_SEC, now),
            "1 hour ago"
        );
        assert_eq!(
            format_relative_time_at(SAMPLE_NANOS - 3 * 86_400 * NANOS_PER_SEC, now),
            "3 days ago"
        );
    }
}
