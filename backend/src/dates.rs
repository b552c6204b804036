use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer};

/// Parses `DD/MM/YYYY` (or `D/M/YYYY`). Anything else, including impossible
/// calendar dates, yields `None`.
pub fn parse_uk_date(input: &str) -> Option<NaiveDate> {
    let mut parts = input.trim().split('/');
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() || year <= 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn format_uk_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    let input = input.trim().trim_end_matches('Z');
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
}

fn parse_time(input: &str) -> Option<NaiveTime> {
    let input = input.trim();
    NaiveTime::parse_from_str(input, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M"))
        .ok()
}

/// Accepts ISO timestamps with or without seconds, as sent by
/// `datetime-local` inputs.
pub fn deserialize_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_datetime(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date and time: {raw}"))),
    }
}

pub fn deserialize_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_time(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time: {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uk_dates() {
        assert_eq!(parse_uk_date("25/12/2023"), NaiveDate::from_ymd_opt(2023, 12, 25));
        assert_eq!(parse_uk_date("1/2/2024"), NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn rejects_malformed_dates() {
        assert_eq!(parse_uk_date(""), None);
        assert_eq!(parse_uk_date("2023-12-25"), None);
        assert_eq!(parse_uk_date("25/12"), None);
        assert_eq!(parse_uk_date("25/12/2023/1"), None);
        assert_eq!(parse_uk_date("31/02/2023"), None);
        assert_eq!(parse_uk_date("0/1/2023"), None);
    }

    #[test]
    fn formats_uk_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(format_uk_date(date), "07/03/2024");
    }

    #[test]
    fn datetime_without_seconds() {
        let parsed = parse_datetime("2024-03-07T09:30").unwrap();
        assert_eq!(parsed.format("%H:%M:%S").to_string(), "09:30:00");
        assert!(parse_datetime("2024-03-07T09:30:15.250Z").is_some());
        assert!(parse_datetime("yesterday").is_none());
    }

    #[test]
    fn time_with_or_without_seconds() {
        assert_eq!(parse_time("08:15"), NaiveTime::from_hms_opt(8, 15, 0));
        assert_eq!(parse_time("08:15:30"), NaiveTime::from_hms_opt(8, 15, 30));
        assert_eq!(parse_time("8am"), None);
    }
}
