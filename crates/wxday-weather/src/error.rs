//! Error taxonomy for date normalization, remote fetches and the cache.

use chrono::NaiveDate;
use thiserror::Error;
use wxday_core::NetworkError;

/// Why a raw date string was rejected before any lookup happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRejection {
    #[error("Unable to parse date '{raw}': {reason}")]
    Unparseable { raw: String, reason: String },

    #[error("Invalid date '{raw}': day {day} exceeds the {max_day} days in {year}-{month:02}")]
    DayOutOfRange {
        raw: String,
        year: i32,
        month: u32,
        day: u32,
        max_day: u32,
    },

    #[error("Invalid date '{raw}': {date} is in the future (today is {today})")]
    FutureDate {
        raw: String,
        date: NaiveDate,
        today: NaiveDate,
    },

    #[error("Invalid date '{raw}': {date} is before {earliest}, the start of archive coverage")]
    TooFarPast {
        raw: String,
        date: NaiveDate,
        earliest: NaiveDate,
    },
}

impl DateRejection {
    /// The literal that was rejected.
    pub fn raw(&self) -> &str {
        match self {
            Self::Unparseable { raw, .. }
            | Self::DayOutOfRange { raw, .. }
            | Self::FutureDate { raw, .. }
            | Self::TooFarPast { raw, .. } => raw,
        }
    }

    /// True when no format matched at all, as opposed to a calendar or range rule.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::Unparseable { .. })
    }
}

/// A provider payload that does not hold one complete day.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload is malformed: {0}")]
    Malformed(String),

    #[error("payload has no daily section")]
    MissingDaily,

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("payload is for {found}, expected {expected}")]
    DateMismatch { expected: String, found: String },
}

/// Weather pipeline errors.
///
/// Only `Input` is fatal to a batch; everything else is captured into the
/// result for the entry that produced it.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Input unavailable: {0}")]
    Input(String),

    #[error(transparent)]
    Parse(DateRejection),

    #[error(transparent)]
    Validation(DateRejection),

    #[error("Weather request for {date} failed: {source}")]
    Transport { date: String, source: NetworkError },

    #[error("No data returned for {date}: {reason}")]
    Data { date: String, reason: String },

    #[error("Cached data incomplete for {date}: {reason}")]
    CacheCorrupt { date: String, reason: String },

    #[error("Failed to write cache entry for {date}: {reason}")]
    CacheWrite { date: String, reason: String },
}

impl From<DateRejection> for WeatherError {
    fn from(rejection: DateRejection) -> Self {
        if rejection.is_parse_failure() {
            WeatherError::Parse(rejection)
        } else {
            WeatherError::Validation(rejection)
        }
    }
}

impl WeatherError {
    /// Whether this error aborts the whole batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Input(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_routes_to_parse_or_validation() {
        let unparseable = DateRejection::Unparseable {
            raw: "soon".into(),
            reason: "no supported date format matched".into(),
        };
        assert!(matches!(
            WeatherError::from(unparseable),
            WeatherError::Parse(_)
        ));

        let out_of_range = DateRejection::DayOutOfRange {
            raw: "April 31, 2022".into(),
            year: 2022,
            month: 4,
            day: 31,
            max_day: 30,
        };
        assert!(matches!(
            WeatherError::from(out_of_range),
            WeatherError::Validation(_)
        ));
    }

    #[test]
    fn test_messages_name_input_and_rule() {
        let err = DateRejection::DayOutOfRange {
            raw: "April 31, 2022".into(),
            year: 2022,
            month: 4,
            day: 31,
            max_day: 30,
        };
        let msg = err.to_string();
        assert!(msg.contains("April 31, 2022"));
        assert!(msg.contains("2022-04"));
        assert!(msg.contains("30 days"));

        let err = WeatherError::Transport {
            date: "2021-02-27".into(),
            source: NetworkError::Timeout,
        };
        assert_eq!(
            err.to_string(),
            "Weather request for 2021-02-27 failed: Request timed out"
        );
    }

    #[test]
    fn test_only_input_is_fatal() {
        assert!(WeatherError::Input("dates.txt".into()).is_fatal());
        assert!(!WeatherError::Data {
            date: "2021-02-27".into(),
            reason: "missing precipitation_sum".into()
        }
        .is_fatal());
    }
}
