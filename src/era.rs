//! Japanese era (和暦) dates such as `令和6年4月1日`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Gregorian year of year zero for each supported era
const ERA_OFFSETS: [(&str, i32); 2] = [("令和", 2018), ("平成", 1988)];

static ERA_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(令和|平成)\s*(\d+|元)\s*年\s*(\d+)\s*月\s*(\d+)\s*日")
        .expect("era date pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EraDateError {
    #[error("invalid number '{0}' in era date")]
    InvalidNumber(String),

    #[error("{year}-{month}-{day} is not a calendar date")]
    InvalidDate { year: i32, month: u32, day: u32 },
}

/// Find an era date in `text` and convert it to a Gregorian date.
///
/// `Ok(None)` means no era date is present. A date whose numbers are out of
/// range is an error so the caller can skip that entry.
pub fn parse_era_date(text: &str) -> Result<Option<NaiveDate>, EraDateError> {
    let text = fold_fullwidth_digits(text);
    let Some(caps) = ERA_DATE_RE.captures(&text) else {
        return Ok(None);
    };

    let Some(offset) = era_offset(&caps[1]) else {
        return Ok(None);
    };

    let era_year: i32 = match &caps[2] {
        "元" => 1,
        n => parse_number(n)?,
    };
    let month: u32 = parse_number(&caps[3])?;
    let day: u32 = parse_number(&caps[4])?;

    let year = offset
        .checked_add(era_year)
        .ok_or_else(|| EraDateError::InvalidNumber(caps[2].to_string()))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or(EraDateError::InvalidDate { year, month, day })
}

fn era_offset(era: &str) -> Option<i32> {
    ERA_OFFSETS
        .iter()
        .find(|(name, _)| *name == era)
        .map(|(_, offset)| *offset)
}

fn parse_number<T: std::str::FromStr>(s: &str) -> Result<T, EraDateError> {
    s.parse()
        .map_err(|_| EraDateError::InvalidNumber(s.to_string()))
}

/// Replace full-width digits (０-９) with ASCII ones
fn fold_fullwidth_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            _ => c,
        })
        .collect()
}
