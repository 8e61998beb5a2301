//! One user-facing search at a time: resolve, fetch both payloads
//! concurrently, normalize, and publish the result only if no newer search
//! started in the meantime.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;

use crate::{
    error::{FetchError, FetchKind, SearchError},
    location::LocationResolver,
    model::{Query, WeatherReport},
    normalize::normalize_current,
    provider::WeatherSource,
    units::TemperatureUnit,
};

/// What the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub report: Option<WeatherReport>,
    /// User-facing message of the last failed search, until dismissed.
    pub error: Option<String>,
    pub loading: bool,
    /// City of the last applied report; target of [`WeatherSearch::retry`].
    pub last_city: Option<String>,
    pub display_unit: TemperatureUnit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Applied(Result<WeatherReport, SearchError>),
    /// A newer search started before this one finished; its result was dropped.
    Superseded,
}

#[derive(Debug)]
pub struct WeatherSearch {
    source: Arc<dyn WeatherSource>,
    generation: AtomicU64,
    state: Mutex<SearchState>,
}

impl WeatherSearch {
    pub fn new(source: Arc<dyn WeatherSource>) -> Self {
        Self {
            source,
            generation: AtomicU64::new(0),
            state: Mutex::new(SearchState::default()),
        }
    }

    pub fn snapshot(&self) -> SearchState {
        self.state.lock().clone()
    }

    /// Blank input is refused before any state changes or requests.
    pub async fn search_city(&self, city: &str) -> SearchOutcome {
        let city = city.trim();
        if city.is_empty() {
            tracing::debug!("ignoring blank city search");
            return SearchOutcome::Applied(Err(SearchError::EmptyCity));
        }
        let city = city.to_string();
        let generation = self.begin();
        let result = fetch_report(self.source.as_ref(), &Query::City(city)).await;
        self.finish(generation, result)
    }

    pub async fn search_location(&self, resolver: &LocationResolver) -> SearchOutcome {
        let generation = self.begin();
        let result = async {
            let coords = resolver.resolve().await?;
            fetch_report(self.source.as_ref(), &Query::Coordinates(coords)).await
        }
        .await;
        self.finish(generation, result)
    }

    /// Re-run the search for the last known city. `None` when there is none.
    pub async fn retry(&self) -> Option<SearchOutcome> {
        let city = self.state.lock().last_city.clone()?;
        Some(self.search_city(&city).await)
    }

    pub fn dismiss_error(&self) {
        self.state.lock().error = None;
    }

    /// Changes how temperatures are shown; stored data is untouched.
    pub fn set_display_unit(&self, unit: TemperatureUnit) {
        self.state.lock().display_unit = unit;
    }

    fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.lock();
        state.loading = true;
        state.error = None;
        generation
    }

    fn finish(&self, generation: u64, result: Result<WeatherReport, SearchError>) -> SearchOutcome {
        let mut state = self.state.lock();

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "dropping result of superseded search");
            return SearchOutcome::Superseded;
        }

        state.loading = false;
        match &result {
            Ok(report) => {
                tracing::info!(city = %report.current.city, "weather loaded");
                state.last_city = Some(report.current.city.clone());
                state.report = Some(report.clone());
            }
            Err(err) => {
                tracing::warn!(error = %err, "search failed");
                state.error = Some(err.to_string());
            }
        }
        SearchOutcome::Applied(result)
    }
}

/// Fetch current conditions and forecast for `query` concurrently. Either
/// failure fails the whole report.
pub async fn fetch_report(
    source: &dyn WeatherSource,
    query: &Query,
) -> Result<WeatherReport, SearchError> {
    let (raw, forecast) =
        tokio::try_join!(source.fetch_weather(query), source.fetch_forecast(query))?;
    let current = normalize_current(&raw)
        .map_err(|e| FetchError::new(FetchKind::Weather, query.label(), e))?;
    Ok(WeatherReport { current, forecast })
}
