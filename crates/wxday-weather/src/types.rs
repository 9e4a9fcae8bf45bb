use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use wxday_core::WeatherConfig;

use crate::error::{PayloadError, WeatherError};

/// Daily series requested from the archive, in request order.
pub const DAILY_FIELDS: [&str; 3] = ["temperature_2m_max", "temperature_2m_min", "precipitation_sum"];

/// Geographic point the archive is queried for
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&WeatherConfig> for Location {
    fn from(config: &WeatherConfig) -> Self {
        Self {
            latitude: config.latitude,
            longitude: config.longitude,
        }
    }
}

/// One line of batch input, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDateEntry {
    pub position: usize,
    pub raw: String,
}

/// Year, month and day as read from a literal, not yet checked against the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// A calendar-valid date inside the archive window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedDate(NaiveDate);

impl NormalizedDate {
    /// Only the normalizer hands these out, after range checks.
    pub(crate) fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// Zero-padded `yyyy-MM-dd`, also used as the cache key.
    pub fn to_canonical(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year(), self.month(), self.day())
    }
}

impl std::fmt::Display for NormalizedDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

/// The three daily values derived from a provider payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    pub min_temperature_c: f64,
    pub max_temperature_c: f64,
    pub precipitation_mm: f64,
}

/// Shape of an archive response; everything optional so shape problems are
/// reported per field instead of as one opaque decode error.
#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: Option<DailySeries>,
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    time: Option<Vec<String>>,
    temperature_2m_max: Option<Vec<Option<f64>>>,
    temperature_2m_min: Option<Vec<Option<f64>>>,
    precipitation_sum: Option<Vec<Option<f64>>>,
}

fn first_value(series: Option<&Vec<Option<f64>>>, name: &'static str) -> Result<f64, PayloadError> {
    series
        .and_then(|values| values.first().copied().flatten())
        .ok_or(PayloadError::MissingField(name))
}

impl WeatherRecord {
    /// Derive the record for `date` from a raw archive payload.
    ///
    /// Fails if any of the three series is absent, empty, or null for the day.
    pub fn from_payload(date: NaiveDate, payload: &serde_json::Value) -> Result<Self, PayloadError> {
        let response = ArchiveResponse::deserialize(payload)
            .map_err(|e| PayloadError::Malformed(e.to_string()))?;
        let daily = response.daily.ok_or(PayloadError::MissingDaily)?;

        if let Some(found) = daily.time.as_ref().and_then(|t| t.first()) {
            let expected = date.format("%Y-%m-%d").to_string();
            if *found != expected {
                return Err(PayloadError::DateMismatch {
                    expected,
                    found: found.clone(),
                });
            }
        }

        Ok(Self {
            date,
            min_temperature_c: first_value(daily.temperature_2m_min.as_ref(), "temperature_2m_min")?,
            max_temperature_c: first_value(daily.temperature_2m_max.as_ref(), "temperature_2m_max")?,
            precipitation_mm: first_value(daily.precipitation_sum.as_ref(), "precipitation_sum")?,
        })
    }
}

/// Outcome of one batch entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    Success,
    Cached,
    Error,
}

/// Per-entry result as exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub original_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation: Option<f64>,
    pub status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub from_cache: bool,
}

impl ProcessingResult {
    fn with_record(original: &str, record: &WeatherRecord, status: ProcessingStatus) -> Self {
        Self {
            original_date: original.to_string(),
            normalized_date: Some(record.date.format("%Y-%m-%d").to_string()),
            min_temperature: Some(record.min_temperature_c),
            max_temperature: Some(record.max_temperature_c),
            precipitation: Some(record.precipitation_mm),
            status,
            error_message: None,
            from_cache: status == ProcessingStatus::Cached,
        }
    }

    /// Freshly fetched from the archive.
    pub fn success(original: &str, record: &WeatherRecord) -> Self {
        Self::with_record(original, record, ProcessingStatus::Success)
    }

    /// Served from the on-disk cache.
    pub fn cached(original: &str, record: &WeatherRecord) -> Self {
        Self::with_record(original, record, ProcessingStatus::Cached)
    }

    /// Failed entry. Weather fields stay empty.
    ///
    /// The message always names the raw input, even when the error itself
    /// only knows the canonical key.
    pub fn error(
        original: &str,
        normalized_date: Option<String>,
        error: &WeatherError,
        from_cache: bool,
    ) -> Self {
        let mut message = error.to_string();
        if !message.contains(original) {
            message = format!("{} (input '{}')", message, original);
        }

        Self {
            original_date: original.to_string(),
            normalized_date,
            min_temperature: None,
            max_temperature: None,
            precipitation: None,
            status: ProcessingStatus::Error,
            error_message: Some(message),
            from_cache,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            ProcessingStatus::Success | ProcessingStatus::Cached
        )
    }
}

/// Aggregated outcome of one batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub results: Vec<ProcessingResult>,
    pub total_processed: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub cached_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl BatchSummary {
    /// Compute the counts from the ordered results.
    pub fn from_results(results: Vec<ProcessingResult>, timestamp: DateTime<Utc>) -> Self {
        let success_count = results.iter().filter(|r| r.is_success()).count();
        let error_count = results
            .iter()
            .filter(|r| r.status == ProcessingStatus::Error)
            .count();
        let cached_count = results.iter().filter(|r| r.from_cache).count();

        Self {
            total_processed: results.len(),
            success_count,
            error_count,
            cached_count,
            results,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn payload(day: &str) -> serde_json::Value {
        json!({
            "latitude": 32.78,
            "longitude": -96.8,
            "daily_units": {"temperature_2m_max": "°C"},
            "daily": {
                "time": [day],
                "temperature_2m_max": [18.4],
                "temperature_2m_min": [6.1],
                "precipitation_sum": [0.3]
            }
        })
    }

    #[test]
    fn test_canonical_is_zero_padded() {
        let d = NormalizedDate::new(date(1941, 3, 7));
        assert_eq!(d.to_canonical(), "1941-03-07");
        assert_eq!(d.to_string(), "1941-03-07");
    }

    #[test]
    fn test_record_from_complete_payload() {
        let record = WeatherRecord::from_payload(date(2021, 2, 27), &payload("2021-02-27")).unwrap();
        assert_eq!(record.min_temperature_c, 6.1);
        assert_eq!(record.max_temperature_c, 18.4);
        assert_eq!(record.precipitation_mm, 0.3);
    }

    #[test]
    fn test_record_missing_series() {
        let mut p = payload("2021-02-27");
        p["daily"]
            .as_object_mut()
            .unwrap()
            .remove("precipitation_sum");
        let err = WeatherRecord::from_payload(date(2021, 2, 27), &p).unwrap_err();
        assert_eq!(err, PayloadError::MissingField("precipitation_sum"));
    }

    #[test]
    fn test_record_empty_or_null_series() {
        let mut p = payload("2021-02-27");
        p["daily"]["temperature_2m_min"] = json!([]);
        assert_eq!(
            WeatherRecord::from_payload(date(2021, 2, 27), &p).unwrap_err(),
            PayloadError::MissingField("temperature_2m_min")
        );

        p["daily"]["temperature_2m_min"] = json!([null]);
        assert_eq!(
            WeatherRecord::from_payload(date(2021, 2, 27), &p).unwrap_err(),
            PayloadError::MissingField("temperature_2m_min")
        );
    }

    #[test]
    fn test_record_without_daily_or_wrong_day() {
        let err = WeatherRecord::from_payload(date(2021, 2, 27), &json!({"latitude": 1.0})).unwrap_err();
        assert_eq!(err, PayloadError::MissingDaily);

        let err = WeatherRecord::from_payload(date(2021, 2, 27), &payload("2021-02-28")).unwrap_err();
        assert!(matches!(err, PayloadError::DateMismatch { .. }));

        let err = WeatherRecord::from_payload(date(2021, 2, 27), &json!({"daily": "nope"})).unwrap_err();
        assert!(matches!(err, PayloadError::Malformed(_)));
    }

    #[test]
    fn test_result_serializes_with_camel_case_and_omits_absent_fields() {
        let err = WeatherError::Data {
            date: "2021-02-27".into(),
            reason: "missing precipitation_sum".into(),
        };
        let result = ProcessingResult::error("02/27/2021", Some("2021-02-27".into()), &err, false);
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["originalDate"], "02/27/2021");
        assert_eq!(value["normalizedDate"], "2021-02-27");
        assert_eq!(value["status"], "Error");
        assert_eq!(value["fromCache"], false);
        assert!(value.get("minTemperature").is_none());
        assert_eq!(
            value["errorMessage"],
            "No data returned for 2021-02-27: missing precipitation_sum (input '02/27/2021')"
        );
    }

    #[test]
    fn test_error_message_does_not_repeat_raw_input() {
        let err = WeatherError::Data {
            date: "2021-02-27".into(),
            reason: "missing precipitation_sum".into(),
        };
        let result = ProcessingResult::error("2021-02-27", Some("2021-02-27".into()), &err, false);
        assert_eq!(
            result.error_message.as_deref(),
            Some("No data returned for 2021-02-27: missing precipitation_sum")
        );
    }

    #[test]
    fn test_summary_counts() {
        let record = WeatherRecord::from_payload(date(2021, 2, 27), &payload("2021-02-27")).unwrap();
        let corrupt = WeatherError::CacheCorrupt {
            date: "2020-01-01".into(),
            reason: "missing daily".into(),
        };
        let rejected = WeatherError::Input("x".into());
        let results = vec![
            ProcessingResult::success("a", &record),
            ProcessingResult::cached("b", &record),
            ProcessingResult::cached("c", &record),
            ProcessingResult::error("d", Some("2020-01-01".into()), &corrupt, true),
            ProcessingResult::error("e", None, &rejected, false),
        ];

        let summary = BatchSummary::from_results(results, Utc::now());
        assert_eq!(summary.total_processed, 5);
        assert_eq!(summary.success_count, 3);
        assert_eq!(summary.error_count, 2);
        assert_eq!(summary.cached_count, 3);
    }
}
