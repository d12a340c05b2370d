//! Date parsing for the handful of layouts card issuers export.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("The given date ('{0}') was not in an acceptable format. Try entering the date in the format 'YYYY-MM-DD'.")]
pub struct DateParseError(pub String);

/// Parses a date string in one of the accepted layouts, in order of precedence:
///
/// - `YYYYMMDD`
/// - `YYYY-M-D`
/// - `M-D-YYYY`
/// - `M-D-YY`
///
/// Delimited forms may use `-`, `/` or `.` and need not zero-pad months or days.
pub fn parse_date(s: &str) -> Result<NaiveDate, DateParseError> {
    let s = s.trim();
    let err = || DateParseError(s.to_string());

    let components: Vec<&str> = if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        vec![&s[..4], &s[4..6], &s[6..]]
    } else {
        s.split(['-', '/', '.']).collect()
    };
    let [first, second, third] = components[..] else {
        return Err(err());
    };
    let numbers = [first, second, third]
        .iter()
        .map(|c| parse_component(c))
        .collect::<Option<Vec<u32>>>()
        .ok_or_else(err)?;
    if !(1..=2).contains(&second.len()) {
        return Err(err());
    }

    let (year, month, day) = match (first.len(), third.len()) {
        (4, 1..=2) => (numbers[0] as i32, numbers[1], numbers[2]),
        (1..=2, 4) => (numbers[2] as i32, numbers[0], numbers[1]),
        (1..=2, 1..=2) => (expand_two_digit_year(numbers[2]), numbers[0], numbers[1]),
        _ => return Err(err()),
    };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(err)
}

fn parse_component(component: &str) -> Option<u32> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    component.parse().ok()
}

/// Two-digit years 69-99 land in the 1900s, 00-68 in the 2000s.
fn expand_two_digit_year(year: u32) -> i32 {
    let year = year as i32;
    if year >= 69 {
        1900 + year
    } else {
        2000 + year
    }
}

/// Anything that can stand in for an activity's transaction date.
pub trait IntoActivityDate {
    fn into_activity_date(self) -> Result<NaiveDate, DateParseError>;
}

impl IntoActivityDate for NaiveDate {
    fn into_activity_date(self) -> Result<NaiveDate, DateParseError> {
        Ok(self)
    }
}

impl IntoActivityDate for &str {
    fn into_activity_date(self) -> Result<NaiveDate, DateParseError> {
        parse_date(self)
    }
}

impl IntoActivityDate for String {
    fn into_activity_date(self) -> Result<NaiveDate, DateParseError> {
        parse_date(&self)
    }
}

impl IntoActivityDate for &String {
    fn into_activity_date(self) -> Result<NaiveDate, DateParseError> {
        parse_date(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_iso() {
        assert_eq!(parse_date("2020-05-30").unwrap(), date(2020, 5, 30));
    }

    #[test]
    fn parse_compact() {
        assert_eq!(parse_date("20200530").unwrap(), date(2020, 5, 30));
    }

    #[test]
    fn parse_year_first_unpadded() {
        assert_eq!(parse_date("2020/5/3").unwrap(), date(2020, 5, 3));
        assert_eq!(parse_date("2020.05.03").unwrap(), date(2020, 5, 3));
    }

    #[test]
    fn parse_us_slash() {
        assert_eq!(parse_date("1/2/2000").unwrap(), date(2000, 1, 2));
        assert_eq!(parse_date("12/31/1999").unwrap(), date(1999, 12, 31));
    }

    #[test]
    fn parse_two_digit_year() {
        assert_eq!(parse_date("1/2/00").unwrap(), date(2000, 1, 2));
        assert_eq!(parse_date("05-30-20").unwrap(), date(2020, 5, 30));
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(parse_date(" 1/1/2000 ").unwrap(), date(2000, 1, 1));
    }

    #[test]
    fn parse_invalid() {
        assert!(parse_date("invalid").is_err());
        assert!(parse_date("").is_err());
        assert!(parse_date("2020-05").is_err());
        assert!(parse_date("2020-13-01").is_err());
        assert!(parse_date("2/30/2020").is_err());
        assert!(parse_date("123-4-5").is_err());
        assert!(parse_date("1/a/2000").is_err());
    }

    #[test]
    fn error_message_suggests_iso_format() {
        let err = parse_date("yesterday").unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn into_activity_date_accepts_values_and_strings() {
        assert_eq!(date(2020, 1, 1).into_activity_date().unwrap(), date(2020, 1, 1));
        assert_eq!("2020-01-01".into_activity_date().unwrap(), date(2020, 1, 1));
        assert_eq!(
            String::from("2020-01-01").into_activity_date().unwrap(),
            date(2020, 1, 1)
        );
    }
}
