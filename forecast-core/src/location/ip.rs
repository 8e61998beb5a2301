//! Position lookup through an IP geolocation service (ipapi.co-compatible
//! JSON).

use std::{net::IpAddr, sync::Arc};

use parking_lot::Mutex;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tokio::time::Instant;

use crate::{config::LocationConfig, model::Coordinate};

use super::{Geolocation, Position, PositionErrorCode, PositionOptions, PositionSink};

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct Fix {
    at: Instant,
    position: Position,
}

#[derive(Debug, Clone)]
pub struct IpGeolocation {
    lookup_url: String,
    http: Client,
    last_fix: Arc<Mutex<Option<Fix>>>,
}

impl IpGeolocation {
    pub fn new(lookup_url: impl Into<String>) -> Self {
        Self {
            lookup_url: lookup_url.into(),
            http: Client::new(),
            last_fix: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_config(config: &LocationConfig) -> Self {
        Self::new(config.lookup_url.as_str())
    }

    fn cached(&self, maximum_age: std::time::Duration) -> Option<Position> {
        let fix = (*self.last_fix.lock())?;
        (fix.at.elapsed() <= maximum_age).then_some(fix.position)
    }
}

impl Geolocation for IpGeolocation {
    fn is_supported(&self) -> bool {
        Url::parse(&self.lookup_url).is_ok()
    }

    fn is_secure_context(&self) -> bool {
        is_secure_origin(&self.lookup_url)
    }

    fn request_position(&self, options: PositionOptions, sink: PositionSink) {
        if let Some(position) = self.cached(options.maximum_age) {
            tracing::debug!("reusing cached IP position");
            sink.success(position);
            return;
        }

        let http = self.http.clone();
        let url = self.lookup_url.clone();
        let last_fix = Arc::clone(&self.last_fix);

        tokio::spawn(async move {
            match lookup(&http, &url, options).await {
                Ok(position) => {
                    *last_fix.lock() = Some(Fix {
                        at: Instant::now(),
                        position,
                    });
                    sink.success(position);
                }
                Err(code) => {
                    sink.failure(code);
                }
            }
        });
    }
}

async fn lookup(
    http: &Client,
    url: &str,
    options: PositionOptions,
) -> Result<Position, PositionErrorCode> {
    let res = http
        .get(url)
        .timeout(options.timeout)
        .send()
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "IP geolocation request failed");
            if e.is_timeout() {
                PositionErrorCode::Timeout
            } else {
                PositionErrorCode::PositionUnavailable
            }
        })?;

    let status = res.status();
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(PositionErrorCode::PermissionDenied);
    }
    if !status.is_success() {
        tracing::debug!(%status, "IP geolocation returned an error status");
        return Err(PositionErrorCode::PositionUnavailable);
    }

    let body: IpApiResponse = res.json().await.map_err(|e| {
        tracing::debug!(error = %e, "IP geolocation parse error");
        PositionErrorCode::PositionUnavailable
    })?;

    if body.error {
        tracing::debug!(reason = ?body.reason, "IP geolocation refused the lookup");
        return Err(PositionErrorCode::PositionUnavailable);
    }

    let coords = body
        .latitude
        .zip(body.longitude)
        .and_then(|(lat, lon)| Coordinate::new(lat, lon))
        .ok_or(PositionErrorCode::PositionUnavailable)?;

    tracing::debug!(city = ?body.city, "IP geolocation resolved");

    Ok(Position {
        coords,
        accuracy_meters: None,
    })
}

/// HTTPS, or plain HTTP against a loopback host.
pub fn is_secure_origin(url: &str) -> bool {
    let Ok(url) = Url::parse(url) else {
        return false;
    };

    match url.scheme() {
        "https" => true,
        "http" => match url.host_str() {
            Some(host) => {
                host == "localhost"
                    || host.ends_with(".localhost")
                    || host
                        .trim_start_matches('[')
                        .trim_end_matches(']')
                        .parse::<IpAddr>()
                        .is_ok_and(|ip| ip.is_loopback())
            }
            None => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::LocationError,
        location::{LocationResolver, ResolverOptions},
    };
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn secure_origins() {
        assert!(is_secure_origin("https://ipapi.co/json/"));
        assert!(is_secure_origin("http://localhost:3000/"));
        assert!(is_secure_origin("http://app.localhost/"));
        assert!(is_secure_origin("http://127.0.0.1:8080/json"));
        assert!(is_secure_origin("http://127.0.0.2/json"));
        assert!(is_secure_origin("http://127.255.255.254/json"));
        assert!(is_secure_origin("http://[::1]:8080/json"));
        assert!(!is_secure_origin("http://ipapi.co/json/"));
        assert!(!is_secure_origin("http://128.0.0.1/json"));
        assert!(!is_secure_origin("http://10.0.0.1/json"));
        assert!(!is_secure_origin("ftp://localhost/"));
        assert!(!is_secure_origin("not a url"));
    }

    #[tokio::test]
    async fn insecure_lookup_url_is_rejected() {
        let resolver = LocationResolver::new(Arc::new(IpGeolocation::new("http://ipapi.co/json/")));
        assert_eq!(resolver.resolve().await, Err(LocationError::InsecureContext));
    }

    #[tokio::test]
    async fn unparseable_lookup_url_is_unsupported() {
        let resolver = LocationResolver::new(Arc::new(IpGeolocation::new("")));
        assert_eq!(resolver.resolve().await, Err(LocationError::Unsupported));
    }

    #[tokio::test]
    async fn resolves_and_reuses_fresh_fix() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ip": "203.0.113.7",
                "city": "London",
                "latitude": 51.5074,
                "longitude": -0.1278
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let platform = Arc::new(IpGeolocation::new(format!("{}/json/", mock_server.uri())));
        let resolver = LocationResolver::new(platform);

        let first = resolver.resolve().await.expect("should resolve");
        let second = resolver.resolve().await.expect("should reuse cached fix");

        assert_eq!(first.latitude(), 51.5074);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn slow_lookup_times_out_within_request_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "latitude": 51.5, "longitude": -0.12 }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let platform = Arc::new(IpGeolocation::new(format!("{}/json/", mock_server.uri())));
        let options = ResolverOptions {
            position: PositionOptions {
                timeout: Duration::from_millis(100),
                ..PositionOptions::default()
            },
            outer_timeout: Duration::from_secs(10),
            ..ResolverOptions::default()
        };
        let resolver = LocationResolver::new(platform).with_options(options);

        let start = std::time::Instant::now();
        let err = resolver.resolve().await.unwrap_err();

        assert_eq!(err, LocationError::Timeout);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn forbidden_maps_to_permission_denied() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let platform = Arc::new(IpGeolocation::new(format!("{}/json/", mock_server.uri())));
        let err = LocationResolver::new(platform).resolve().await.unwrap_err();

        assert_eq!(err, LocationError::PermissionDenied);
    }

    #[tokio::test]
    async fn rate_limited_body_maps_to_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": true,
                "reason": "RateLimited"
            })))
            .mount(&mock_server)
            .await;

        let platform = Arc::new(IpGeolocation::new(format!("{}/json/", mock_server.uri())));
        let err = LocationResolver::new(platform).resolve().await.unwrap_err();

        assert_eq!(err, LocationError::PositionUnavailable);
    }
}
