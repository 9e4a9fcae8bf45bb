//! Drives each raw date through normalize, cache lookup, fetch and store.
//!
//! Entries are handled strictly one after another: an entry's fetch and
//! store finish before the next entry is looked at, so a run never has two
//! requests in flight for the same day. Adding concurrency here needs a
//! per-key single-flight gate in front of the cache.

use chrono::Utc;
use tracing::instrument;

use crate::cache::WeatherCache;
use crate::dates::DateNormalizer;
use crate::error::WeatherError;
use crate::input::DateSource;
use crate::provider::RemoteWeatherClient;
use crate::types::{BatchSummary, Location, ProcessingResult, RawDateEntry, WeatherRecord};

pub struct WeatherOrchestrator<C> {
    normalizer: DateNormalizer,
    cache: WeatherCache,
    client: C,
    location: Location,
}

impl<C: RemoteWeatherClient> WeatherOrchestrator<C> {
    pub fn new(client: C, cache: WeatherCache, location: Location) -> Self {
        Self {
            normalizer: DateNormalizer::new(),
            cache,
            client,
            location,
        }
    }

    /// Replace the date normalizer, e.g. to pin "today".
    pub fn with_normalizer(mut self, normalizer: DateNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    pub fn normalizer(&self) -> &DateNormalizer {
        &self.normalizer
    }

    /// Read every entry from `source` and process the batch.
    ///
    /// # Errors
    /// Only `WeatherError::Input`, when the source is unreadable. Per-entry
    /// failures are reported inside the summary.
    pub async fn run<S: DateSource + ?Sized>(&self, source: &S) -> Result<BatchSummary, WeatherError> {
        let dates = source.read_dates()?;
        Ok(self.process_batch(dates).await)
    }

    /// Process `dates` in order and aggregate the results.
    pub async fn process_batch(&self, dates: Vec<String>) -> BatchSummary {
        let mut results = Vec::with_capacity(dates.len());

        for (position, raw) in dates.into_iter().enumerate() {
            let entry = RawDateEntry { position, raw };
            results.push(self.process_entry(&entry).await);
        }

        let summary = BatchSummary::from_results(results, Utc::now());
        tracing::info!(
            total = summary.total_processed,
            success = summary.success_count,
            errors = summary.error_count,
            cached = summary.cached_count,
            "Batch complete"
        );
        summary
    }

    /// Run one entry to completion. Never fails; errors land in the result.
    #[instrument(skip(self, entry), fields(position = entry.position, raw = %entry.raw))]
    pub async fn process_entry(&self, entry: &RawDateEntry) -> ProcessingResult {
        let date = match self.normalizer.validate(&entry.raw) {
            Ok(date) => date,
            Err(rejection) => {
                tracing::warn!("Rejected: {}", rejection);
                return ProcessingResult::error(&entry.raw, None, &rejection.into(), false);
            }
        };
        let key = date.to_canonical();

        if self.cache.exists(&key) {
            // A corrupt entry is reported, not refetched; `wxday evict` clears it.
            return match self.cache.load(&key) {
                Ok(record) => {
                    tracing::debug!("Cache hit for {}", key);
                    ProcessingResult::cached(&entry.raw, &record)
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    ProcessingResult::error(&entry.raw, Some(key), &e, true)
                }
            };
        }

        tracing::info!("Fetching weather for {}", key);
        let payload = match self
            .client
            .fetch(self.location.latitude, self.location.longitude, &key)
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                if let WeatherError::Transport { source, .. } = &e {
                    tracing::warn!(kind = source.kind(), "{}", e);
                } else {
                    tracing::warn!("{}", e);
                }
                return ProcessingResult::error(&entry.raw, Some(key), &e, false);
            }
        };

        let record = match WeatherRecord::from_payload(date.as_naive(), &payload) {
            Ok(record) => record,
            Err(reason) => {
                let e = WeatherError::Data {
                    date: key.clone(),
                    reason: reason.to_string(),
                };
                tracing::warn!("{}", e);
                return ProcessingResult::error(&entry.raw, Some(key), &e, false);
            }
        };

        // The fetched values are good either way; a failed write only costs a refetch later.
        if let Err(e) = self.cache.store(&key, &payload) {
            tracing::warn!("{}", e);
        }

        ProcessingResult::success(&entry.raw, &record)
    }
}
