//! Display-time unit conversion. Stored data always keeps provider units.

use std::num::ParseFloatError;

use serde::{Deserialize, Serialize};

use crate::normalize::format_temperature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindSpeedUnit {
    #[default]
    MetersPerSecond,
    KilometersPerHour,
    MilesPerHour,
}

impl WindSpeedUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            WindSpeedUnit::MetersPerSecond => "m/s",
            WindSpeedUnit::KilometersPerHour => "km/h",
            WindSpeedUnit::MilesPerHour => "mph",
        }
    }
}

/// Render a Celsius value in `unit`, one decimal.
pub fn convert_temperature(celsius: f64, unit: TemperatureUnit) -> String {
    match unit {
        TemperatureUnit::Celsius => format_temperature(celsius),
        TemperatureUnit::Fahrenheit => format_temperature(celsius * 9.0 / 5.0 + 32.0),
    }
}

/// Apply [`convert_temperature`] to an already normalized Celsius string.
pub fn display_temperature(normalized: &str, unit: TemperatureUnit) -> Result<String, ParseFloatError> {
    let celsius: f64 = normalized.trim().parse()?;
    Ok(convert_temperature(celsius, unit))
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Render a m/s wind speed in `unit`, one decimal.
pub fn convert_wind_speed(meters_per_second: f64, unit: WindSpeedUnit) -> String {
    let value = match unit {
        WindSpeedUnit::MetersPerSecond => meters_per_second,
        WindSpeedUnit::KilometersPerHour => meters_per_second * 3.6,
        WindSpeedUnit::MilesPerHour => meters_per_second * 2.237,
    };
    format!("{value:.1}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freezing_and_boiling() {
        assert_eq!(convert_temperature(0.0, TemperatureUnit::Fahrenheit), "32.0");
        assert_eq!(convert_temperature(100.0, TemperatureUnit::Fahrenheit), "212.0");
        assert_eq!(convert_temperature(-40.0, TemperatureUnit::Fahrenheit), "-40.0");
        assert_eq!(convert_temperature(15.2, TemperatureUnit::Celsius), "15.2");
    }

    #[test]
    fn fahrenheit_round_trips_within_a_tenth() {
        let mut c = -60.0;
        while c <= 60.0 {
            let normalized = format_temperature(c);
            let shown = display_temperature(&normalized, TemperatureUnit::Fahrenheit)
                .expect("normalized string parses");
            let back = fahrenheit_to_celsius(shown.parse().expect("rendered string parses"));
            let original: f64 = normalized.parse().expect("normalized string parses");
            assert!(
                (back - original).abs() <= 0.1,
                "{normalized} -> {shown}F -> {back}"
            );
            c += 0.37;
        }
    }

    #[test]
    fn display_does_not_touch_input() {
        let stored = String::from("21.4");
        let _ = display_temperature(&stored, TemperatureUnit::Fahrenheit);
        assert_eq!(stored, "21.4");
        assert!(display_temperature("warm", TemperatureUnit::Celsius).is_err());
    }

    #[test]
    fn wind_speed_units() {
        assert_eq!(convert_wind_speed(3.5, WindSpeedUnit::MetersPerSecond), "3.5");
        assert_eq!(convert_wind_speed(10.0, WindSpeedUnit::KilometersPerHour), "36.0");
        assert_eq!(convert_wind_speed(10.0, WindSpeedUnit::MilesPerHour), "22.4");
    }
}
