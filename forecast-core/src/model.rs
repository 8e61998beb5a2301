use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::raw::{RawForecast, RawForecastEntry};

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Returns `None` when either component is out of range or not finite.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        (lat_ok && lon_ok).then_some(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// What a fetch is for: a free-text place name or a coordinate pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    City(String),
    Coordinates(Coordinate),
}

impl Query {
    /// Label used when reporting a failed fetch.
    pub fn label(&self) -> &str {
        match self {
            Query::City(city) => city,
            Query::Coordinates(_) => "coordinates",
        }
    }
}

/// Unit system requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
            UnitSystem::Standard => "standard",
        }
    }

    pub const fn all() -> &'static [UnitSystem] {
        &[UnitSystem::Metric, UnitSystem::Imperial, UnitSystem::Standard]
    }

    /// Suffix for temperatures returned in this system.
    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "°C",
            UnitSystem::Imperial => "°F",
            UnitSystem::Standard => "K",
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UnitSystem {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            "standard" => Ok(UnitSystem::Standard),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: metric, imperial, standard."
            )),
        }
    }
}

/// Resolution tag of a provider icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconSize {
    #[default]
    X2,
    X4,
}

impl IconSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            IconSize::X2 => "2x",
            IconSize::X4 => "4x",
        }
    }
}

/// Build the PNG URL for a provider icon code. No request is made.
pub fn icon_url(base: &str, icon: &str, size: IconSize) -> String {
    format!("{}/{}@{}.png", base.trim_end_matches('/'), icon, size.as_str())
}

/// Current conditions in the shape the presentation layer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedWeather {
    pub city: String,
    pub country: String,
    /// One fractional digit, in the provider's units.
    pub temp: String,
    pub feels_like: String,
    pub humidity: u8,
    pub description: String,
    pub icon: String,
    pub wind_speed: f64,
    pub pressure: u32,
    /// Kilometers.
    pub visibility: f64,
    pub sunrise: String,
    pub sunset: String,
}

/// Forecast entries that fall on one local calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub min_temp: f64,
    pub max_temp: f64,
    pub entries: Vec<RawForecastEntry>,
}

/// Everything a single successful search produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub current: NormalizedWeather,
    pub forecast: RawForecast,
}
