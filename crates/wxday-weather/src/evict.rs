//! Manual removal of cache entries by raw date.

use std::path::PathBuf;

use crate::cache::WeatherCache;
use crate::dates::DateNormalizer;
use crate::error::WeatherError;

/// What happened to one requested date.
#[derive(Debug)]
pub enum EvictOutcome {
    Removed(PathBuf),
    /// Valid date, but nothing was cached for it.
    Absent(String),
    /// The date was rejected before touching the cache.
    Skipped(WeatherError),
}

/// Normalize each raw date and delete its cache entry, in order.
///
/// # Errors
/// `WeatherError::CacheWrite` when an existing entry cannot be deleted. Dates
/// handled before the failure stay removed.
pub fn evict_dates(
    cache: &WeatherCache,
    normalizer: &DateNormalizer,
    dates: &[String],
) -> Result<Vec<(String, EvictOutcome)>, WeatherError> {
    let mut outcomes = Vec::with_capacity(dates.len());

    for raw in dates {
        let date = match normalizer.validate(raw) {
            Ok(date) => date,
            Err(rejection) => {
                outcomes.push((raw.clone(), EvictOutcome::Skipped(rejection.into())));
                continue;
            }
        };

        let key = normalizer.to_canonical(&date);
        let outcome = if cache.remove(&key)? {
            EvictOutcome::Removed(cache.entry_path(&key))
        } else {
            EvictOutcome::Absent(key)
        };
        outcomes.push((raw.clone(), outcome));
    }

    Ok(outcomes)
}
