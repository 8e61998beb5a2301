use chrono::Local;
use forecast_core::{
    IconSize, NormalizedWeather, OpenWeatherClient, RawForecast, TemperatureUnit, UnitSystem,
    location::Diagnostics,
    normalize::{day_label, format_temperature, group_by_day},
    units::display_temperature,
};

/// Temperatures are converted only when the provider returned Celsius.
fn temperature(value: &str, units: UnitSystem, display: TemperatureUnit) -> String {
    match units {
        UnitSystem::Metric => match display_temperature(value, display) {
            Ok(shown) => format!("{shown}{}", display.symbol()),
            Err(_) => format!("{value}{}", units.temperature_suffix()),
        },
        _ => format!("{value}{}", units.temperature_suffix()),
    }
}

fn wind_unit(units: UnitSystem) -> &'static str {
    match units {
        UnitSystem::Imperial => "mph",
        _ => "m/s",
    }
}

pub fn print_current(weather: &NormalizedWeather, client: &OpenWeatherClient, display: TemperatureUnit) {
    let units = client.units();

    println!("{}, {}", weather.city, weather.country);
    println!(
        "  {}  {}",
        temperature(&weather.temp, units, display),
        capitalize(&weather.description)
    );
    println!("  Feels like   {}", temperature(&weather.feels_like, units, display));
    println!("  Humidity     {}%", weather.humidity);
    println!("  Wind         {} {}", weather.wind_speed, wind_unit(units));
    println!("  Pressure     {} hPa", weather.pressure);
    println!("  Visibility   {} km", weather.visibility);
    println!("  Sunrise      {}", weather.sunrise);
    println!("  Sunset       {}", weather.sunset);
    println!("  Icon         {}", client.icon_url(&weather.icon, IconSize::X2));
}

pub fn print_forecast(forecast: &RawForecast, units: UnitSystem, display: TemperatureUnit) {
    let today = Local::now().date_naive();

    println!();
    println!("5-day forecast");
    for day in group_by_day(forecast, &Local) {
        let summary = day
            .entries
            .iter()
            .find_map(|e| e.weather.first().and_then(|w| w.description.clone()))
            .unwrap_or_default();
        let rain = day
            .entries
            .iter()
            .filter_map(|e| e.pop)
            .fold(0.0_f64, f64::max);

        if day.min_temp.is_nan() {
            println!("  {:<10} {}", day_label(day.date, today), capitalize(&summary));
            continue;
        }

        println!(
            "  {:<10} {:>9} / {:<9} {:>3.0}% rain  {}",
            day_label(day.date, today),
            temperature(&format_temperature(day.min_temp), units, display),
            temperature(&format_temperature(day.max_temp), units, display),
            rain * 100.0,
            capitalize(&summary)
        );
    }
}

pub fn print_diagnostics(diagnostics: &Diagnostics) {
    let yes_no = |b: bool| if b { "yes" } else { "no" };

    println!("Location supported:   {}", yes_no(diagnostics.supported));
    println!("Secure context:       {}", yes_no(diagnostics.secure_context));
    println!("Permission API:       {}", yes_no(diagnostics.permission_api));
    match &diagnostics.permission_state {
        Some(Ok(state)) => println!("Permission state:     {state}"),
        Some(Err(err)) => println!("Permission state:     error ({err})"),
        None => {}
    }
}

/// The provider sends lowercase descriptions.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_only_metric_temperatures() {
        assert_eq!(
            temperature("0.0", UnitSystem::Metric, TemperatureUnit::Fahrenheit),
            "32.0°F"
        );
        assert_eq!(
            temperature("15.2", UnitSystem::Metric, TemperatureUnit::Celsius),
            "15.2°C"
        );
        assert_eq!(
            temperature("59.4", UnitSystem::Imperial, TemperatureUnit::Fahrenheit),
            "59.4°F"
        );
        assert_eq!(
            temperature("288.3", UnitSystem::Standard, TemperatureUnit::Celsius),
            "288.3K"
        );
    }

    #[test]
    fn capitalizes_first_letter() {
        assert_eq!(capitalize("light rain"), "Light rain");
        assert_eq!(capitalize(""), "");
    }
}
