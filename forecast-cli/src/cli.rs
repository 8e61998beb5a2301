use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use forecast_core::{
    Config, Coordinate, FixedGeolocation, Geolocation, IpGeolocation, LocationResolver,
    OpenWeatherClient, SearchOutcome, TemperatureUnit, UnitSystem, WeatherSearch,
    location::diagnose,
};
use inquire::{Password, PasswordDisplayMode, Select, Text};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Current weather and 5-day forecast")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key, unit system and language.
    Configure,

    /// Show weather for a city.
    Show {
        /// City name, optionally with a country code, e.g. "London,GB".
        city: String,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Show weather for the current location.
    Here {
        /// Latitude to use instead of looking the position up.
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude to use instead of looking the position up.
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Print the detected location.
    Location {
        /// Report what the location capability supports instead of resolving.
        #[arg(long)]
        diagnose: bool,
    },
}

#[derive(Debug, Clone, Copy, Args)]
pub struct DisplayArgs {
    /// Show temperatures in Fahrenheit (metric data only).
    #[arg(long)]
    pub fahrenheit: bool,

    /// Include the 5-day forecast.
    #[arg(long)]
    pub forecast: bool,

    /// Print the raw report as JSON.
    #[arg(long, conflicts_with = "fahrenheit")]
    pub json: bool,
}

impl DisplayArgs {
    fn unit(&self) -> TemperatureUnit {
        if self.fahrenheit {
            TemperatureUnit::Fahrenheit
        } else {
            TemperatureUnit::Celsius
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city, display } => {
                let config = load_config()?;
                let (client, search) = build_search(&config, display)?;
                let outcome = search.search_city(&city).await;
                report(outcome, &client, &search, display)
            }
            Command::Here { lat, lon, display } => {
                let config = load_config()?;
                let (client, search) = build_search(&config, display)?;
                let resolver = resolver(&config, lat.zip(lon))?;
                let outcome = search.search_location(&resolver).await;
                report(outcome, &client, &search, display)
            }
            Command::Location { diagnose: true } => {
                let config = load_config()?;
                let resolver = resolver(&config, None)?;
                let diagnostics = diagnose(resolver.platform()).await;
                output::print_diagnostics(&diagnostics);
                Ok(())
            }
            Command::Location { diagnose: false } => {
                let config = load_config()?;
                let coords = resolver(&config, None)?.resolve().await?;
                println!("{coords}");
                Ok(())
            }
        }
    }
}

fn load_config() -> anyhow::Result<Config> {
    let config = Config::load()?.with_env_overrides();
    tracing::debug!(
        base_url = %config.base_url,
        units = config.units.as_str(),
        lang = %config.lang,
        "configuration loaded"
    );
    Ok(config)
}

fn build_search(
    config: &Config,
    display: DisplayArgs,
) -> anyhow::Result<(OpenWeatherClient, WeatherSearch)> {
    let client = OpenWeatherClient::from_config(config)?;
    let search = WeatherSearch::new(Arc::new(client.clone()));
    search.set_display_unit(display.unit());
    Ok((client, search))
}

/// Explicit flags win over a configured fixed position, which wins over IP lookup.
fn resolver(config: &Config, flags: Option<(f64, f64)>) -> anyhow::Result<LocationResolver> {
    tracing::debug!(
        flags = flags.is_some(),
        configured = config.location.fixed().is_some(),
        "choosing location source"
    );
    let platform: Arc<dyn Geolocation> = match flags {
        Some((lat, lon)) => {
            let coords = Coordinate::new(lat, lon)
                .ok_or_else(|| anyhow!("Coordinates out of range: {lat}, {lon}"))?;
            Arc::new(FixedGeolocation::new(coords))
        }
        None => match config.location.fixed() {
            Some(coords) => Arc::new(FixedGeolocation::new(coords)),
            None => Arc::new(IpGeolocation::from_config(&config.location)),
        },
    };
    Ok(LocationResolver::new(platform))
}

fn report(
    outcome: SearchOutcome,
    client: &OpenWeatherClient,
    search: &WeatherSearch,
    display: DisplayArgs,
) -> anyhow::Result<()> {
    match outcome {
        SearchOutcome::Applied(Ok(report)) => {
            if display.json {
                let json = serde_json::to_string_pretty(&report)
                    .context("Failed to serialize weather report")?;
                println!("{json}");
            } else {
                let state = search.snapshot();
                output::print_current(&report.current, client, state.display_unit);
                if display.forecast {
                    output::print_forecast(&report.forecast, client.units(), state.display_unit);
                }
            }
            Ok(())
        }
        SearchOutcome::Applied(Err(err)) => Err(err.into()),
        // Only one search runs per invocation.
        SearchOutcome::Superseded => {
            tracing::debug!("search was superseded; nothing to show");
            Ok(())
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeatherMap API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let start = UnitSystem::all()
        .iter()
        .position(|u| *u == config.units)
        .unwrap_or(0);
    config.units = Select::new("Units requested from the provider:", UnitSystem::all().to_vec())
        .with_starting_cursor(start)
        .prompt()
        .context("Failed to read unit system")?;

    let current_lang = config.lang.clone();
    config.lang = Text::new("Language code:")
        .with_default(&current_lang)
        .prompt()
        .context("Failed to read language")?;

    config.api_key()?;
    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}
