//! Batch input sources.

use std::path::{Path, PathBuf};

use crate::error::WeatherError;

/// Supplies the ordered raw date strings for one batch.
pub trait DateSource {
    /// All entries, trimmed and non-empty, in input order.
    ///
    /// # Errors
    /// `WeatherError::Input` when the source cannot be read at all.
    fn read_dates(&self) -> Result<Vec<String>, WeatherError>;
}

/// Line-oriented text file, one date per line. Blank lines are skipped.
#[derive(Debug, Clone)]
pub struct FileDateSource {
    path: PathBuf,
}

impl FileDateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn non_empty_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

impl DateSource for FileDateSource {
    fn read_dates(&self) -> Result<Vec<String>, WeatherError> {
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| WeatherError::Input(format!("{}: {}", self.path.display(), e)))?;

        let dates = non_empty_lines(&contents);
        tracing::info!("Read {} dates from {}", dates.len(), self.path.display());
        Ok(dates)
    }
}

/// In-memory input, mostly for callers that already hold the list.
impl DateSource for Vec<String> {
    fn read_dates(&self) -> Result<Vec<String>, WeatherError> {
        Ok(self
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }
}
