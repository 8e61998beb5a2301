//! Core library for the `forecast` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeatherMap client and its raw payload shapes
//! - Normalization of provider payloads into display-ready models
//! - Location resolution over a pluggable platform capability
//! - Search orchestration (concurrent fetches, last-request-wins)
//!
//! It is used by `forecast-cli`, but can also be reused by other front ends.

pub mod config;
pub mod error;
pub mod location;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod raw;
pub mod search;
pub mod units;

pub use config::{Config, LocationConfig};
pub use error::{FetchError, FetchKind, LocationError, SearchError, WeatherError};
pub use location::{
    FixedGeolocation, Geolocation, IpGeolocation, LocationResolver, PermissionState,
    PositionErrorCode, PositionOptions, ResolverOptions,
};
pub use model::{
    Coordinate, DailyForecast, IconSize, NormalizedWeather, Query, UnitSystem, WeatherReport,
};
pub use normalize::{normalize_current, normalize_current_in};
pub use provider::{OpenWeatherClient, WeatherSource};
pub use raw::{RawForecast, RawWeather};
pub use search::{SearchOutcome, SearchState, WeatherSearch};
pub use units::{TemperatureUnit, WindSpeedUnit};
