// Parsing of Spanish prose dates such as "25 de diciembre" or "24 y 31 de diciembre"
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateParseError {
    #[error("could not parse date: {0}")]
    Unparseable(String),

    #[error("unknown month: {0}")]
    UnknownMonth(String),

    #[error("day {day} out of range for month {month} of {year}")]
    DayOutOfRange { day: u32, month: u32, year: i32 },
}

const MONTHS: [(&str, u32); 12] = [
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
];

/// Looks up the month number (1-12) for a lower-case Spanish month name.
pub fn month_from_name(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .find(|(month_name, _)| *month_name == name)
        .map(|(_, number)| *number)
}

/// Parses a Spanish date expression, assuming `year` since the source omits it.
///
/// Two forms are recognised, in this order:
/// - `"<day> de <month>"`
/// - `"<day> y <other day> de <month>"`, of which only the first day is kept
///
/// Anything after the month word is ignored. The result is midnight UTC.
pub fn parse(text: &str, year: i32) -> Result<DateTime<Utc>, DateParseError> {
    let normalized = text.trim().to_lowercase();
    let tokens: Vec<&str> = normalized.split_whitespace().collect();

    let (day, month_name) = match_single_day(&tokens)
        .or_else(|| match_paired_days(&tokens))
        .ok_or_else(|| DateParseError::Unparseable(normalized.clone()))?;

    let month = month_from_name(month_name)
        .ok_or_else(|| DateParseError::UnknownMonth(month_name.to_string()))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or(DateParseError::DayOutOfRange { day, month, year })
}

// "<day> de <month>"
fn match_single_day<'a>(tokens: &[&'a str]) -> Option<(u32, &'a str)> {
    match tokens {
        [day, "de", month, ..] => Some((parse_day(day)?, *month)),
        _ => None,
    }
}

// "<day> y <day> de <month>"
fn match_paired_days<'a>(tokens: &[&'a str]) -> Option<(u32, &'a str)> {
    match tokens {
        [day, "y", other, "de", month, ..] => {
            parse_day(other)?;
            Some((parse_day(day)?, *month))
        }
        _ => None,
    }
}

fn parse_day(token: &str) -> Option<u32> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}
