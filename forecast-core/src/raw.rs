//! Wire shapes of the OpenWeatherMap 2.5 `/weather` and `/forecast` payloads.
//!
//! Fields are optional so that a missing value surfaces as a
//! `MalformedPayload` naming the field instead of an opaque JSON error.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawMain {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub humidity: Option<u8>,
    pub pressure: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawCondition {
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawWind {
    pub speed: Option<f64>,
    pub deg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawSys {
    pub country: Option<String>,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

/// Current-conditions payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawWeather {
    pub name: Option<String>,
    pub dt: Option<i64>,
    pub main: Option<RawMain>,
    #[serde(default)]
    pub weather: Vec<RawCondition>,
    pub wind: Option<RawWind>,
    pub sys: Option<RawSys>,
    /// Meters.
    pub visibility: Option<f64>,
    /// Shift in seconds from UTC at the location.
    pub timezone: Option<i32>,
}

/// One 3-hour slot of the forecast.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawForecastEntry {
    pub dt: i64,
    pub main: Option<RawMain>,
    #[serde(default)]
    pub weather: Vec<RawCondition>,
    pub wind: Option<RawWind>,
    pub visibility: Option<f64>,
    /// Probability of precipitation, 0..=1.
    pub pop: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawCity {
    pub name: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<i32>,
}

/// 5-day / 3-hour forecast payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawForecast {
    pub city: Option<RawCity>,
    #[serde(default)]
    pub list: Vec<RawForecastEntry>,
}

/// Error body returned with non-success statuses, e.g. `{"cod":"404","message":"city not found"}`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawErrorBody {
    pub message: Option<String>,
}
