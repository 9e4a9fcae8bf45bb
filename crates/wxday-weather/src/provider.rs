//! Open-Meteo historical archive client.

use reqwest::{Client, Url};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use wxday_core::{ConfigError, NetworkError, ReqwestErrorExt, WeatherConfig};

use crate::error::WeatherError;
use crate::types::DAILY_FIELDS;

/// Source of raw daily payloads for a coordinate pair.
///
/// Implementations make exactly one attempt per call.
pub trait RemoteWeatherClient {
    fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        iso_date: &str,
    ) -> impl Future<Output = Result<serde_json::Value, WeatherError>> + Send;
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: Url,
    timezone: String,
}

impl WeatherProvider {
    /// Build a provider from configuration. The timeout bounds each request
    /// end to end, body included.
    ///
    /// # Errors
    /// `ConfigError::Invalid` for a bad base URL or if the HTTP client cannot be built.
    pub fn new(config: &WeatherConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.archive_base_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "weather.archive_base_url '{}': {}",
                config.archive_base_url, e
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            timezone: config.timezone.clone(),
        })
    }

    fn request_url(&self, latitude: f64, longitude: f64, iso_date: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &latitude.to_string())
            .append_pair("longitude", &longitude.to_string())
            .append_pair("start_date", iso_date)
            .append_pair("end_date", iso_date)
            .append_pair("daily", &DAILY_FIELDS.join(","))
            .append_pair("timezone", &self.timezone);
        url
    }
}

/// Pull the provider's `reason` out of an error body, falling back to the raw text.
fn error_reason(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("reason").and_then(|r| r.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

impl RemoteWeatherClient for WeatherProvider {
    async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        iso_date: &str,
    ) -> Result<serde_json::Value, WeatherError> {
        let transport = |source: NetworkError| WeatherError::Transport {
            date: iso_date.to_string(),
            source,
        };

        let url = self.request_url(latitude, longitude, iso_date);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(transport(NetworkError::ServerError {
                status: status.as_u16(),
                message: error_reason(&body),
            }));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport(e.into_network_error()))?;

        serde_json::from_str(&body).map_err(|e| WeatherError::Data {
            date: iso_date.to_string(),
            reason: format!("response body is not valid JSON: {}", e),
        })
    }
}
