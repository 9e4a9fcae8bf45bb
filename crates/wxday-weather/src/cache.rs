//! File-backed cache of raw archive payloads, one `<yyyy-MM-dd>.json` per day.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::WeatherError;
use crate::types::WeatherRecord;

#[derive(Debug, Clone)]
pub struct WeatherCache {
    cache_dir: PathBuf,
}

/// Parse a canonical key. Anything else never touches the filesystem.
fn key_date(iso_date: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(iso_date, "%Y-%m-%d").ok()?;
    (date.format("%Y-%m-%d").to_string() == iso_date).then_some(date)
}

impl WeatherCache {
    /// Cache rooted at `cache_dir`. The directory is created on first store.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn entry_path(&self, iso_date: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", iso_date))
    }

    /// Whether an entry is present for `iso_date`.
    pub fn exists(&self, iso_date: &str) -> bool {
        key_date(iso_date).is_some() && self.entry_path(iso_date).is_file()
    }

    /// Read an entry back and re-derive its record from the stored payload.
    ///
    /// # Errors
    /// `WeatherError::CacheCorrupt` for an unreadable, malformed, or
    /// incomplete entry.
    pub fn load(&self, iso_date: &str) -> Result<WeatherRecord, WeatherError> {
        let corrupt = |reason: String| WeatherError::CacheCorrupt {
            date: iso_date.to_string(),
            reason,
        };

        let date = key_date(iso_date).ok_or_else(|| corrupt("invalid cache key".to_string()))?;
        let path = self.entry_path(iso_date);

        let contents = fs::read_to_string(&path)
            .map_err(|e| corrupt(format!("cannot read {}: {}", path.display(), e)))?;
        let payload: serde_json::Value = serde_json::from_str(&contents)
            .map_err(|e| corrupt(format!("invalid JSON in {}: {}", path.display(), e)))?;

        WeatherRecord::from_payload(date, &payload).map_err(|e| corrupt(e.to_string()))
    }

    /// Persist the raw payload for `iso_date`.
    ///
    /// The entry is written to a temporary sibling and renamed into place, so
    /// readers never see a partial file.
    ///
    /// # Errors
    /// `WeatherError::CacheWrite` if the key is not canonical or any I/O fails.
    pub fn store(&self, iso_date: &str, payload: &serde_json::Value) -> Result<(), WeatherError> {
        let write_err = |reason: String| WeatherError::CacheWrite {
            date: iso_date.to_string(),
            reason,
        };

        if key_date(iso_date).is_none() {
            return Err(write_err("invalid cache key".to_string()));
        }

        fs::create_dir_all(&self.cache_dir).map_err(|e| {
            write_err(format!(
                "cannot create {}: {}",
                self.cache_dir.display(),
                e
            ))
        })?;

        let json = serde_json::to_string_pretty(payload)
            .map_err(|e| write_err(format!("cannot serialize payload: {}", e)))?;

        let path = self.entry_path(iso_date);
        let tmp_path = self.cache_dir.join(format!("{}.json.tmp", iso_date));
        fs::write(&tmp_path, json)
            .map_err(|e| write_err(format!("cannot write {}: {}", tmp_path.display(), e)))?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                tracing::warn!("Leaving stale {}: {}", tmp_path.display(), cleanup);
            }
            return Err(write_err(format!(
                "cannot move into {}: {}",
                path.display(),
                e
            )));
        }

        tracing::debug!("Cached weather payload at {}", path.display());
        Ok(())
    }

    /// Delete the entry for `iso_date`. Returns whether one existed.
    ///
    /// # Errors
    /// `WeatherError::CacheWrite` if the file exists but cannot be removed.
    pub fn remove(&self, iso_date: &str) -> Result<bool, WeatherError> {
        if !self.exists(iso_date) {
            return Ok(false);
        }

        let path = self.entry_path(iso_date);
        fs::remove_file(&path).map_err(|e| WeatherError::CacheWrite {
            date: iso_date.to_string(),
            reason: format!("cannot remove {}: {}", path.display(), e),
        })?;

        tracing::info!("Removed cache entry {}", path.display());
        Ok(true)
    }
}
