use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    config::Config,
    error::{FetchError, FetchKind, WeatherError},
    model::{IconSize, Query, UnitSystem, icon_url},
    raw::{RawErrorBody, RawForecast, RawWeather},
};

use super::WeatherSource;

/// HTTP client for the OpenWeatherMap 2.5 API.
///
/// Built once from [`Config`]; cheap to clone.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    icon_base_url: String,
    units: UnitSystem,
    lang: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            icon_base_url: crate::config::DEFAULT_ICON_URL.to_string(),
            units: UnitSystem::default(),
            lang: "en".to_string(),
            http: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api_key()?.to_owned();
        Ok(Self::new(api_key, config.base_url.as_str())
            .with_units(config.units)
            .with_lang(config.lang.as_str())
            .with_icon_base_url(config.icon_url.as_str()))
    }

    pub fn with_units(mut self, units: UnitSystem) -> Self {
        self.units = units;
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_icon_base_url(mut self, url: impl Into<String>) -> Self {
        self.icon_base_url = url.into();
        self
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub fn icon_url(&self, icon: &str, size: IconSize) -> String {
        icon_url(&self.icon_base_url, icon, size)
    }

    fn query_params(&self, query: &Query) -> Vec<(&'static str, String)> {
        let mut params = match query {
            Query::City(city) => vec![("q", city.clone())],
            Query::Coordinates(coord) => vec![
                ("lat", coord.latitude().to_string()),
                ("lon", coord.longitude().to_string()),
            ],
        };
        params.push(("appid", self.api_key.clone()));
        params.push(("units", self.units.as_str().to_string()));
        params.push(("lang", self.lang.clone()));
        params
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &Query,
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let res = self
            .http
            .get(&url)
            .query(&self.query_params(query))
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WeatherError::Network(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(%status, endpoint, body = %truncate_body(&body), "provider request failed");
            return Err(http_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::MalformedPayload(e.to_string()))
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn fetch_weather(&self, query: &Query) -> Result<RawWeather, FetchError> {
        tracing::debug!(query = query.label(), "fetching current weather");
        self.get_json("weather", query)
            .await
            .map_err(|e| FetchError::new(FetchKind::Weather, query.label(), e))
    }

    async fn fetch_forecast(&self, query: &Query) -> Result<RawForecast, FetchError> {
        tracing::debug!(query = query.label(), "fetching forecast");
        self.get_json("forecast", query)
            .await
            .map_err(|e| FetchError::new(FetchKind::Forecast, query.label(), e))
    }
}

/// Prefer the provider's own `message`; fall back to the bare status.
fn http_error(status: StatusCode, body: &str) -> WeatherError {
    let message = serde_json::from_str::<RawErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP error: {}", status.as_u16()));

    WeatherError::Http {
        status: status.as_u16(),
        message,
    }
}

fn truncate_body(body: &str) -> &str {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
