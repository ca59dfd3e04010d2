use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Canonical date format used on the wire and on disk
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Canonical time-of-day format used on the wire and on disk
pub const TIME_FORMAT: &str = "%H:%M";

/// Parse time string in HH:MM format
pub fn parse_time(time_str: &str) -> Option<NaiveTime> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    if !parts
        .iter()
        .all(|p| (1..=2).contains(&p.len()) && p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    let hour = parts[0].parse::<u32>().ok()?;
    let minute = parts[1].parse::<u32>().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Parse date string in YYYY-MM-DD format
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = date_str.split('-').collect();
    if parts.len() != 3 || parts[0].len() != 4 {
        return None;
    }
    NaiveDate::parse_from_str(date_str, DATE_FORMAT).ok()
}

/// Format a date as YYYY-MM-DD
pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Format a time of day as HH:MM
pub fn format_time(time: &NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Drop seconds and sub-second precision
pub fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.date()
        .and_hms_opt(at.hour(), at.minute(), 0)
        .unwrap_or(at)
}

/// Current local wall-clock time, without a time zone
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// One hour after `start`, clamped to the last minute of the same day
pub fn one_hour_after_clamped(start: NaiveTime) -> NaiveTime {
    let (end, wrapped) = start.overflowing_add_signed(chrono::Duration::hours(1));
    if wrapped != 0 {
        NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(start)
    } else {
        end
    }
}

/// Serde adapter for `NaiveDate` as YYYY-MM-DD
pub mod serde_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw)))
    }
}

/// Serde adapter for `NaiveTime` as HH:MM
pub mod serde_time {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid time: {}", raw)))
    }
}

/// Serde adapter for an optional HH:MM time; empty strings read as `None`
pub mod serde_time_opt {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serializer.serialize_some(&super::format_time(time)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => super::parse_time(value)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid time: {}", value))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time() {
        // Valid cases
        assert_eq!(parse_time("00:00"), NaiveTime::from_hms_opt(0, 0, 0));
        assert_eq!(parse_time("12:30"), NaiveTime::from_hms_opt(12, 30, 0));
        assert_eq!(parse_time("23:59"), NaiveTime::from_hms_opt(23, 59, 0));
        assert_eq!(parse_time("9:05"), NaiveTime::from_hms_opt(9, 5, 0));

        // Invalid cases
        assert_eq!(parse_time("24:00"), None); // Hour out of range
        assert_eq!(parse_time("12:60"), None); // Minute out of range
        assert_eq!(parse_time("12:30:45"), None); // Too many parts
        assert_eq!(parse_time("12"), None); // Too few parts
        assert_eq!(parse_time("12:ab"), None); // Invalid minute
        assert_eq!(parse_time("+1:30"), None);
        assert_eq!(parse_time(""), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-02-29"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(parse_date("2023-02-29"), None);
        assert_eq!(parse_date("2024/02/01"), None);
        assert_eq!(parse_date("24-02-01"), None);
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_date("tomorrow"), None);
    }

    #[test]
    fn test_format_roundtrip_is_canonical() {
        let time = parse_time("7:5").unwrap();
        assert_eq!(format_time(&time), "07:05");
        let date = parse_date("2024-03-09").unwrap();
        assert_eq!(format_date(&date), "2024-03-09");
    }

    #[test]
    fn test_truncate_to_minute() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_milli_opt(8, 55, 42, 250)
            .unwrap();
        let truncated = truncate_to_minute(at);
        assert_eq!(truncated.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-05-01 08:55:00");
        assert_eq!(truncated.nanosecond(), 0);
    }

    #[test]
    fn test_one_hour_after_clamped() {
        let t = |s| parse_time(s).unwrap();
        assert_eq!(one_hour_after_clamped(t("09:15")), t("10:15"));
        assert_eq!(one_hour_after_clamped(t("22:59")), t("23:59"));
        assert_eq!(one_hour_after_clamped(t("23:30")), t("23:59"));
    }
}
