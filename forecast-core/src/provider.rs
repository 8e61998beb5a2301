use crate::{
    error::FetchError,
    model::Query,
    raw::{RawForecast, RawWeather},
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// Source of raw provider payloads.
///
/// Implementations must tag every failure with the query label so the
/// presentation layer can show which search failed.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch_weather(&self, query: &Query) -> Result<RawWeather, FetchError>;

    async fn fetch_forecast(&self, query: &Query) -> Result<RawForecast, FetchError>;
}
