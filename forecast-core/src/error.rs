use std::fmt;

use thiserror::Error;

/// Failure kinds of a location resolution.
///
/// The `Display` text is meant for the user and always carries a remediation
/// hint; match on the variant to tell failures apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Location lookup is not supported here. Please search for a city instead.")]
    Unsupported,

    #[error("Location access requires a secure connection (HTTPS). Please search for a city instead.")]
    InsecureContext,

    #[error(
        "Location access denied. Please allow location access in your settings or search for a city instead."
    )]
    PermissionDenied,

    #[error("Location information is unavailable. Please try searching for a city instead.")]
    PositionUnavailable,

    #[error("Location request timed out. Please try again or search for a city instead.")]
    Timeout,

    #[error("Location access is not available. Please search for a city instead.")]
    Unknown,
}

/// Errors produced while fetching or normalizing provider data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// A required field is missing or has the wrong shape.
    #[error("Malformed provider payload: {0}")]
    MalformedPayload(String),

    /// Non-success status. `message` is the provider's own message when it
    /// supplied one, `HTTP error: <status>` otherwise.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

impl WeatherError {
    pub(crate) fn missing(field: &str) -> Self {
        WeatherError::MalformedPayload(format!("missing field `{field}`"))
    }
}

/// Which provider endpoint a fetch went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Weather,
    Forecast,
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchKind::Weather => f.write_str("weather"),
            FetchKind::Forecast => f.write_str("forecast"),
        }
    }
}

/// A [`WeatherError`] tagged with the query that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to fetch {kind} for {target}: {source}")]
pub struct FetchError {
    pub kind: FetchKind,
    /// City name, or `coordinates`.
    pub target: String,
    #[source]
    pub source: WeatherError,
}

impl FetchError {
    pub fn new(kind: FetchKind, target: impl Into<String>, source: WeatherError) -> Self {
        Self {
            kind,
            target: target.into(),
            source,
        }
    }

    /// The underlying error, without the query prefix.
    pub fn error(&self) -> &WeatherError {
        &self.source
    }
}

/// Everything that can end a single search attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error(transparent)]
    Location(#[from] LocationError),

    /// Covers normalization failures too, tagged as a weather fetch.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The city was empty after trimming; nothing was searched.
    #[error("Please enter a city name.")]
    EmptyCity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_messages_carry_a_hint() {
        for err in [
            LocationError::Unsupported,
            LocationError::InsecureContext,
            LocationError::PermissionDenied,
            LocationError::PositionUnavailable,
            LocationError::Timeout,
            LocationError::Unknown,
        ] {
            let msg = err.to_string();
            assert!(msg.contains("city"), "no remediation hint in: {msg}");
        }
    }

    #[test]
    fn http_error_displays_provider_message_only() {
        let err = WeatherError::Http {
            status: 404,
            message: "city not found".to_string(),
        };
        assert_eq!(err.to_string(), "city not found");
    }

    #[test]
    fn fetch_error_prefixes_query_label() {
        let err = FetchError::new(
            FetchKind::Forecast,
            "coordinates",
            WeatherError::Network("connection refused".into()),
        );
        assert_eq!(
            err.to_string(),
            "Failed to fetch forecast for coordinates: Network error: connection refused"
        );
        assert!(matches!(err.error(), WeatherError::Network(_)));
    }
}
