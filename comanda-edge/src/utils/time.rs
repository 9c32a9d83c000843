//! Timestamp formatting in the restaurant's timezone

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Default business timezone
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Sao_Paulo;

/// Parse an IANA timezone name ("America/Sao_Paulo")
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

fn to_local(millis: i64, tz: Tz) -> Option<DateTime<Tz>> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.with_timezone(&tz))
}

/// "dd/mm/yyyy HH:MM:SS"; out-of-range values print as the raw number
pub fn format_timestamp(millis: i64, tz: Tz) -> String {
    match to_local(millis, tz) {
        Some(dt) => dt.format("%d/%m/%Y %H:%M:%S").to_string(),
        None => millis.to_string(),
    }
}

/// "HH:MM:SS", for kitchen tickets
pub fn format_clock(millis: i64, tz: Tz) -> String {
    match to_local(millis, tz) {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => millis.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-15 15:30:45 UTC
    const TS: i64 = 1_710_516_645_000;

    #[test]
    fn test_format_in_sao_paulo() {
        assert_eq!(format_timestamp(TS, DEFAULT_TIMEZONE), "15/03/2024 12:30:45");
        assert_eq!(format_clock(TS, DEFAULT_TIMEZONE), "12:30:45");
    }

    #[test]
    fn test_format_in_utc() {
        assert_eq!(format_timestamp(TS, chrono_tz::UTC), "15/03/2024 15:30:45");
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("America/Sao_Paulo"), Some(DEFAULT_TIMEZONE));
        assert_eq!(parse_timezone(" UTC "), Some(chrono_tz::UTC));
        assert!(parse_timezone("Mars/Olympus").is_none());
    }
}
