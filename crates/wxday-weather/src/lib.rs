//! Historical daily weather for free-form dates.
//!
//! Normalizes raw date strings, looks each day up in an on-disk cache, and
//! falls back to the Open-Meteo archive for misses.

pub mod cache;
pub mod dates;
pub mod error;
pub mod evict;
pub mod input;
pub mod orchestrator;
pub mod provider;
pub mod types;

pub use cache::WeatherCache;
pub use dates::DateNormalizer;
pub use error::{DateRejection, PayloadError, WeatherError};
pub use evict::{evict_dates, EvictOutcome};
pub use input::{DateSource, FileDateSource};
pub use orchestrator::WeatherOrchestrator;
pub use provider::{RemoteWeatherClient, WeatherProvider};
pub use types::*;
