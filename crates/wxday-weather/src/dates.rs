//! Date normalization for free-form input.
//!
//! A raw string goes through an ordered list of strict formats, first match
//! wins. Strict formats only accept real calendar dates, so "April 31" never
//! rolls over into May. When nothing strict matches, a single permissive
//! reader pulls out month, day and four-digit year in loose layouts; its
//! output is checked against the calendar by [`DateNormalizer::validate`].

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::DateRejection;
use crate::types::{DateParts, NormalizedDate};

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// First day the remote archive has data for.
pub fn archive_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1940, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Gregorian leap year: divisible by 4, except centuries not divisible by 400.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` of `year`, or 0 for a month outside 1..=12.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

// Patterns are string literals; a failure here is a programming error caught by tests.
#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("date pattern must compile")
}

static SLASH_PADDED: Lazy<Regex> = Lazy::new(|| compile(r"^(\d{2})/(\d{2})/(\d{4})$"));
static SLASH_LOOSE: Lazy<Regex> = Lazy::new(|| compile(r"^(\d{1,2})/(\d{1,2})/(\d{4})$"));
static DASH_PADDED: Lazy<Regex> = Lazy::new(|| compile(r"^(\d{2})-(\d{2})-(\d{4})$"));
static FULL_MONTH: Lazy<Regex> =
    Lazy::new(|| compile(r"^([A-Za-z]{4,9})\s+(\d{1,2}),?\s+(\d{4})$"));
static SHORT_MONTH: Lazy<Regex> =
    Lazy::new(|| compile(r"^([A-Za-z]{3})\.?\s+(\d{1,2}),?\s+(\d{4})$"));
static SHORT_MONTH_DASHED: Lazy<Regex> =
    Lazy::new(|| compile(r"^([A-Za-z]{3})-(\d{1,2})-(\d{4})$"));
static FULL_MONTH_DASHED: Lazy<Regex> =
    Lazy::new(|| compile(r"^([A-Za-z]{4,9})-(\d{1,2})-(\d{4})$"));
static ISO: Lazy<Regex> = Lazy::new(|| compile(r"^(\d{4})-(\d{2})-(\d{2})$"));

/// A strict format: its display pattern and the matcher implementing it.
pub struct StrictFormat {
    pub pattern: &'static str,
    matcher: fn(&str) -> Option<DateParts>,
}

impl StrictFormat {
    /// Match `input` exactly, returning parts only for a real calendar date.
    pub fn matches(&self, input: &str) -> Option<DateParts> {
        (self.matcher)(input).filter(is_calendar_date)
    }
}

/// Strict formats in precedence order.
pub const STRICT_FORMATS: &[StrictFormat] = &[
    StrictFormat {
        pattern: "MM/dd/yyyy",
        matcher: match_slash_padded,
    },
    StrictFormat {
        pattern: "M/d/yyyy",
        matcher: match_slash_loose,
    },
    StrictFormat {
        pattern: "MM-dd-yyyy",
        matcher: match_dash_padded,
    },
    StrictFormat {
        pattern: "MMMM d, yyyy",
        matcher: match_full_month,
    },
    StrictFormat {
        pattern: "MMM d, yyyy",
        matcher: match_short_month,
    },
    StrictFormat {
        pattern: "MMM-dd-yyyy",
        matcher: match_short_month_dashed,
    },
    StrictFormat {
        pattern: "MMMM-dd-yyyy",
        matcher: match_full_month_dashed,
    },
    StrictFormat {
        pattern: "yyyy-MM-dd",
        matcher: match_iso,
    },
];

fn number<T: std::str::FromStr>(caps: &Captures<'_>, index: usize) -> Option<T> {
    caps.get(index)?.as_str().parse().ok()
}

fn month_day_year(re: &Regex, input: &str) -> Option<DateParts> {
    let caps = re.captures(input)?;
    Some(DateParts {
        month: number(&caps, 1)?,
        day: number(&caps, 2)?,
        year: number(&caps, 3)?,
    })
}

fn named_month_day_year(
    re: &Regex,
    input: &str,
    month_lookup: fn(&str) -> Option<u32>,
) -> Option<DateParts> {
    let caps = re.captures(input)?;
    Some(DateParts {
        month: month_lookup(caps.get(1)?.as_str())?,
        day: number(&caps, 2)?,
        year: number(&caps, 3)?,
    })
}

fn match_slash_padded(input: &str) -> Option<DateParts> {
    month_day_year(&SLASH_PADDED, input)
}

fn match_slash_loose(input: &str) -> Option<DateParts> {
    month_day_year(&SLASH_LOOSE, input)
}

fn match_dash_padded(input: &str) -> Option<DateParts> {
    month_day_year(&DASH_PADDED, input)
}

fn match_full_month(input: &str) -> Option<DateParts> {
    named_month_day_year(&FULL_MONTH, input, full_month)
}

fn match_short_month(input: &str) -> Option<DateParts> {
    named_month_day_year(&SHORT_MONTH, input, short_month)
}

fn match_short_month_dashed(input: &str) -> Option<DateParts> {
    named_month_day_year(&SHORT_MONTH_DASHED, input, short_month)
}

fn match_full_month_dashed(input: &str) -> Option<DateParts> {
    named_month_day_year(&FULL_MONTH_DASHED, input, full_month)
}

fn match_iso(input: &str) -> Option<DateParts> {
    let caps = ISO.captures(input)?;
    Some(DateParts {
        year: number(&caps, 1)?,
        month: number(&caps, 2)?,
        day: number(&caps, 3)?,
    })
}

fn position_of(name: &str) -> Option<u32> {
    MONTH_NAMES
        .iter()
        .position(|m| *m == name)
        .and_then(|i| u32::try_from(i + 1).ok())
}

fn full_month(name: &str) -> Option<u32> {
    position_of(&name.to_ascii_lowercase())
}

fn short_month(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    if lower.len() != 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|m| m.starts_with(lower.as_str()))
        .and_then(|i| u32::try_from(i + 1).ok())
}

/// Full name, three-letter abbreviation, or "sept".
fn any_month(lower: &str) -> Option<u32> {
    if lower == "sept" {
        return Some(9);
    }
    position_of(lower).or_else(|| short_month(lower))
}

fn is_weekday(lower: &str) -> bool {
    WEEKDAY_NAMES
        .iter()
        .any(|w| *w == lower || (lower.len() == 3 && w.starts_with(lower)))
}

fn is_calendar_date(parts: &DateParts) -> bool {
    NaiveDate::from_ymd_opt(parts.year, parts.month, parts.day).is_some()
}

/// Digits of a numeric token, with an ordinal suffix (`2nd`, `13th`) removed.
fn numeric_token(lower: &str) -> Option<&str> {
    let digits = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| lower.strip_suffix(suffix))
        .unwrap_or(lower);
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(digits)
}

/// Last-resort reader for loose layouts such as "2nd of June 2022",
/// "Sunday, 13 Sept. 2020" or "2020.7.13".
///
/// Years must have four digits. Only coarse ranges are checked here.
fn permissive(input: &str) -> Option<DateParts> {
    let lower = input.to_ascii_lowercase();
    let tokens = lower
        .split(|c: char| c.is_whitespace() || matches!(c, '/' | '-' | '.' | ','))
        .filter(|t| !t.is_empty());

    let mut month_name = None;
    let mut numbers: Vec<&str> = Vec::new();
    for token in tokens {
        if token == "of" || is_weekday(token) {
            continue;
        }
        if let Some(month) = any_month(token) {
            if month_name.replace(month).is_some() {
                return None;
            }
            continue;
        }
        numbers.push(numeric_token(token)?);
    }

    let is_year = |t: &str| t.len() == 4;
    let is_short = |t: &str| t.len() <= 2;

    let (year, month, day) = match (month_name, numbers.as_slice()) {
        (Some(month), &[a, b]) if is_year(a) && is_short(b) => (a, month, b),
        (Some(month), &[a, b]) if is_short(a) && is_year(b) => (b, month, a),
        (None, &[y, m, d]) if is_year(y) && is_short(m) && is_short(d) => (y, m.parse().ok()?, d),
        (None, &[m, d, y]) if is_short(m) && is_short(d) && is_year(y) => (y, m.parse().ok()?, d),
        _ => return None,
    };

    let parts = DateParts {
        year: year.parse().ok()?,
        month,
        day: day.parse().ok()?,
    };
    ((1..=12).contains(&parts.month) && (1..=31).contains(&parts.day)).then_some(parts)
}

/// Parses and validates raw date strings.
#[derive(Debug, Clone, Default)]
pub struct DateNormalizer {
    today: Option<NaiveDate>,
}

impl DateNormalizer {
    /// Normalizer that compares against the local calendar date at call time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizer with a fixed notion of "today".
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Parse `raw` into date parts without range checks.
    ///
    /// # Errors
    /// `DateRejection::Unparseable` when the input is blank or no format matches.
    pub fn parse(&self, raw: &str) -> Result<DateParts, DateRejection> {
        let input = raw.trim();
        if input.is_empty() {
            return Err(DateRejection::Unparseable {
                raw: raw.to_string(),
                reason: "input is empty".to_string(),
            });
        }

        if let Some((format, parts)) = STRICT_FORMATS
            .iter()
            .find_map(|f| f.matches(input).map(|parts| (f, parts)))
        {
            tracing::trace!(format = format.pattern, input, "strict format matched");
            return Ok(parts);
        }

        permissive(input)
            .inspect(|_| tracing::debug!(input, "parsed by permissive fallback"))
            .ok_or_else(|| DateRejection::Unparseable {
                raw: raw.to_string(),
                reason: "no supported date format matched".to_string(),
            })
    }

    /// Parse `raw` and check it against the calendar and the archive window.
    ///
    /// # Errors
    /// Any [`DateRejection`]: unparseable, day out of range, future date, or
    /// before [`archive_start`].
    pub fn validate(&self, raw: &str) -> Result<NormalizedDate, DateRejection> {
        let parts = self.parse(raw)?;

        let max_day = days_in_month(parts.year, parts.month);
        let date = NaiveDate::from_ymd_opt(parts.year, parts.month, parts.day)
            .filter(|_| parts.day <= max_day)
            .ok_or_else(|| DateRejection::DayOutOfRange {
                raw: raw.to_string(),
                year: parts.year,
                month: parts.month,
                day: parts.day,
                max_day,
            })?;

        let today = self.today();
        if date > today {
            return Err(DateRejection::FutureDate {
                raw: raw.to_string(),
                date,
                today,
            });
        }

        let earliest = archive_start();
        if date < earliest {
            return Err(DateRejection::TooFarPast {
                raw: raw.to_string(),
                date,
                earliest,
            });
        }

        Ok(NormalizedDate::new(date))
    }

    /// Canonical `yyyy-MM-dd` form of a normalized date.
    pub fn to_canonical(&self, date: &NormalizedDate) -> String {
        date.to_canonical()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn normalizer() -> DateNormalizer {
        DateNormalizer::with_today(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
    }

    fn canonical(raw: &str) -> String {
        normalizer().validate(raw).unwrap().to_canonical()
    }

    #[test]
    fn test_every_strict_format_round_trips() {
        let cases = [
            ("02/27/2021", "2021-02-27"),
            ("2/7/2021", "2021-02-07"),
            ("12/31/1999", "1999-12-31"),
            ("07-13-2020", "2020-07-13"),
            ("June 2, 2022", "2022-06-02"),
            ("september 30 2010", "2010-09-30"),
            ("Jun 2, 2022", "2022-06-02"),
            ("Dec. 25, 1999", "1999-12-25"),
            ("Jul-13-2020", "2020-07-13"),
            ("July-13-2020", "2020-07-13"),
            ("2020-07-13", "2020-07-13"),
        ];
        for (raw, expected) in cases {
            assert_eq!(canonical(raw), expected, "input {raw:?}");
        }
    }

    #[test]
    fn test_strict_formats_pick_first_match() {
        let matched: Vec<&str> = STRICT_FORMATS
            .iter()
            .filter(|f| f.matches("02/27/2021").is_some())
            .map(|f| f.pattern)
            .collect();
        assert_eq!(matched, vec!["MM/dd/yyyy", "M/d/yyyy"]);
    }

    #[test]
    fn test_strict_format_rejects_rollover() {
        let full = STRICT_FORMATS
            .iter()
            .find(|f| f.pattern == "MMMM d, yyyy")
            .unwrap();
        assert!(full.matches("April 31, 2022").is_none());
        assert!(full.matches("April 30, 2022").is_some());
    }

    #[test]
    fn test_april_31_is_rejected_not_shifted() {
        let err = normalizer().validate("April 31, 2022").unwrap_err();
        assert!(matches!(
            err,
            DateRejection::DayOutOfRange {
                day: 31,
                max_day: 30,
                ..
            }
        ));
        assert!(err.to_string().contains("April 31, 2022"));
    }

    #[test]
    fn test_leap_day() {
        assert_eq!(canonical("February 29, 2020"), "2020-02-29");
        let err = normalizer().validate("February 29, 2021").unwrap_err();
        assert!(matches!(err, DateRejection::DayOutOfRange { max_day: 28, .. }));
        assert_eq!(canonical("02/29/2000"), "2000-02-29");
        assert!(normalizer().validate("02/29/1900").is_err());
    }

    #[test]
    fn test_leap_year_rule() {
        assert!(is_leap_year(2020));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2021));
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2023, 11), 30);
        assert_eq!(days_in_month(2023, 13), 0);
    }

    #[test]
    fn test_future_date_rejected() {
        let err = normalizer().validate("June 16, 2024").unwrap_err();
        assert!(matches!(err, DateRejection::FutureDate { .. }));
        assert!(err.to_string().contains("future"));
        assert_eq!(canonical("June 15, 2024"), "2024-06-15");
    }

    #[test]
    fn test_too_far_past_rejected() {
        let err = normalizer().validate("12/31/1939").unwrap_err();
        assert!(matches!(err, DateRejection::TooFarPast { .. }));
        assert!(err.to_string().contains("1940-01-01"));
        assert_eq!(canonical("01/01/1940"), "1940-01-01");
    }

    #[test]
    fn test_blank_input_fails_fast() {
        for raw in ["", "   ", "\t\n"] {
            let err = normalizer().parse(raw).unwrap_err();
            assert!(matches!(err, DateRejection::Unparseable { .. }));
            assert!(err.to_string().contains("empty"));
        }
    }

    #[test]
    fn test_two_digit_years_never_accepted() {
        for raw in ["02/27/21", "Jul-13-20", "June 2, 22", "21-02-27"] {
            let err = normalizer().validate(raw).unwrap_err();
            assert!(err.is_parse_failure(), "{raw:?} should not parse");
        }
    }

    #[test]
    fn test_unparseable_names_literal() {
        let err = normalizer().validate("next tuesday").unwrap_err();
        assert!(err.is_parse_failure());
        assert_eq!(err.raw(), "next tuesday");
        assert!(err.to_string().contains("'next tuesday'"));
    }

    #[test]
    fn test_permissive_fallback_layouts() {
        assert_eq!(canonical("2nd of June 2022"), "2022-06-02");
        assert_eq!(canonical("Sunday, 13 Sept. 2020"), "2020-09-13");
        assert_eq!(canonical("2020.7.13"), "2020-07-13");
        assert_eq!(canonical("2022 June 2"), "2022-06-02");
        assert_eq!(canonical("  June   2,2022 "), "2022-06-02");
    }

    #[test]
    fn test_permissive_rejects_ambiguous_input() {
        assert!(normalizer().parse("June July 2022").is_err());
        assert!(normalizer().parse("13/45/2020").is_err());
        assert!(normalizer().parse("2020 2021 5").is_err());
    }

    #[test]
    fn test_to_canonical_via_normalizer() {
        let n = normalizer();
        let date = n.validate("Jul-13-2020").unwrap();
        assert_eq!(n.to_canonical(&date), "2020-07-13");
        assert_eq!((date.year(), date.month(), date.day()), (2020, 7, 13));
    }
}
