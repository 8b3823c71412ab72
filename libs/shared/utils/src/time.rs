//! Wall-clock helpers. Every instant lives in one implicit zone, so `NaiveDateTime` is used
//! throughout and offsets on input are dropped after keeping the local wall-clock reading.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

use shared_models::error::AppError;

const INSTANT_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn parse_instant(field: &str, raw: &str) -> Result<NaiveDateTime, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::ValidationError(format!("{} is required", field)));
    }

    INSTANT_FORMATS.iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
        .ok_or_else(|| AppError::ValidationError(format!("Invalid {}: {}", field, raw)))
}

pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError(format!("Invalid {}: expected YYYY-MM-DD", field)))
}

pub fn iso(at: NaiveDateTime) -> String {
    at.format(ISO_FORMAT).to_string()
}

/// 12-hour display form, e.g. `09:30 AM`.
pub fn display_time(at: NaiveDateTime) -> String {
    at.format("%I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn expected() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2099, 1, 5).unwrap().and_hms_opt(10, 30, 0).unwrap()
    }

    #[test]
    fn test_accepted_instant_forms() {
        for raw in [
            "2099-01-05T10:30",
            "2099-01-05T10:30:00",
            "2099-01-05T10:30:00.000",
            "2099-01-05 10:30",
            "2099-01-05T10:30:00Z",
            "2099-01-05T10:30:00+02:00",
        ] {
            assert_eq!(parse_instant("dateTime", raw).unwrap(), expected(), "{}", raw);
        }
    }

    #[test]
    fn test_rejections_name_the_field() {
        assert_matches!(
            parse_instant("dateTime", "tomorrow"),
            Err(AppError::ValidationError(msg)) if msg.contains("dateTime")
        );
        assert_matches!(
            parse_instant("newDateTime", "  "),
            Err(AppError::ValidationError(msg)) if msg == "newDateTime is required"
        );
        assert_matches!(parse_date("date", "05/01/2099"), Err(AppError::ValidationError(_)));
    }

    #[test]
    fn test_formatting() {
        assert_eq!(iso(expected()), "2099-01-05T10:30:00");
        assert_eq!(display_time(expected()), "10:30 AM");
        assert_eq!(display_time(expected() + chrono::Duration::hours(4)), "02:30 PM");
    }
}
