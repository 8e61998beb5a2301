//! Pure mapping from provider payloads to [`NormalizedWeather`], plus the
//! day bucketing used by forecast views.

use chrono::{DateTime, Local, NaiveDate, TimeZone};

use crate::{
    error::WeatherError,
    model::{DailyForecast, NormalizedWeather},
    raw::{RawForecast, RawWeather},
};

/// Normalize a current-conditions payload, formatting sunrise and sunset in
/// the host's local time zone.
pub fn normalize_current(raw: &RawWeather) -> Result<NormalizedWeather, WeatherError> {
    normalize_current_in(raw, &Local)
}

/// Same as [`normalize_current`] with an explicit time zone.
pub fn normalize_current_in<Tz: TimeZone>(
    raw: &RawWeather,
    tz: &Tz,
) -> Result<NormalizedWeather, WeatherError>
where
    Tz::Offset: std::fmt::Display,
{
    let main = raw.main.as_ref().ok_or_else(|| WeatherError::missing("main"))?;
    let condition = raw
        .weather
        .first()
        .ok_or_else(|| WeatherError::missing("weather[0]"))?;
    let wind = raw.wind.as_ref().ok_or_else(|| WeatherError::missing("wind"))?;
    let sys = raw.sys.as_ref().ok_or_else(|| WeatherError::missing("sys"))?;

    let temp = main.temp.ok_or_else(|| WeatherError::missing("main.temp"))?;
    let feels_like = main
        .feels_like
        .ok_or_else(|| WeatherError::missing("main.feels_like"))?;
    let visibility = raw
        .visibility
        .ok_or_else(|| WeatherError::missing("visibility"))?;
    let sunrise = sys.sunrise.ok_or_else(|| WeatherError::missing("sys.sunrise"))?;
    let sunset = sys.sunset.ok_or_else(|| WeatherError::missing("sys.sunset"))?;

    Ok(NormalizedWeather {
        city: raw.name.clone().ok_or_else(|| WeatherError::missing("name"))?,
        country: sys
            .country
            .clone()
            .ok_or_else(|| WeatherError::missing("sys.country"))?,
        temp: format_temperature(temp),
        feels_like: format_temperature(feels_like),
        humidity: main
            .humidity
            .ok_or_else(|| WeatherError::missing("main.humidity"))?,
        description: condition
            .description
            .clone()
            .ok_or_else(|| WeatherError::missing("weather[0].description"))?,
        icon: condition
            .icon
            .clone()
            .ok_or_else(|| WeatherError::missing("weather[0].icon"))?,
        wind_speed: wind.speed.ok_or_else(|| WeatherError::missing("wind.speed"))?,
        pressure: main
            .pressure
            .ok_or_else(|| WeatherError::missing("main.pressure"))?,
        visibility: visibility / 1000.0,
        sunrise: format_clock(sunrise, tz)?,
        sunset: format_clock(sunset, tz)?,
    })
}

/// One fractional digit, no unit.
pub fn format_temperature(value: f64) -> String {
    format!("{value:.1}")
}

/// Format epoch seconds as a 12-hour `hh:mm AM` clock string in `tz`.
pub fn format_clock<Tz: TimeZone>(epoch_secs: i64, tz: &Tz) -> Result<String, WeatherError>
where
    Tz::Offset: std::fmt::Display,
{
    let utc = DateTime::from_timestamp(epoch_secs, 0).ok_or_else(|| {
        WeatherError::MalformedPayload(format!("timestamp {epoch_secs} out of range"))
    })?;
    Ok(utc.with_timezone(tz).format("%I:%M %p").to_string())
}

/// Bucket forecast entries by calendar day in `tz`, keeping provider order.
pub fn group_by_day<Tz: TimeZone>(forecast: &RawForecast, tz: &Tz) -> Vec<DailyForecast> {
    let mut days: Vec<DailyForecast> = Vec::new();

    for entry in &forecast.list {
        let Some(utc) = DateTime::from_timestamp(entry.dt, 0) else {
            tracing::debug!(dt = entry.dt, "skipping forecast entry with invalid timestamp");
            continue;
        };
        let date = utc.with_timezone(tz).date_naive();
        let temp = entry.main.as_ref().and_then(|m| m.temp);

        let idx = match days.iter().position(|d| d.date == date) {
            Some(idx) => idx,
            None => {
                days.push(DailyForecast {
                    date,
                    min_temp: f64::INFINITY,
                    max_temp: f64::NEG_INFINITY,
                    entries: Vec::new(),
                });
                days.len() - 1
            }
        };
        let day = &mut days[idx];

        if let Some(t) = temp {
            day.min_temp = day.min_temp.min(t);
            day.max_temp = day.max_temp.max(t);
        }
        day.entries.push(entry.clone());
    }

    // Days where no entry carried a temperature.
    for day in &mut days {
        if day.min_temp > day.max_temp {
            day.min_temp = f64::NAN;
            day.max_temp = f64::NAN;
        }
    }

    days
}

/// "Today", "Tomorrow" or the weekday name of `date` relative to `today`.
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if today.succ_opt() == Some(date) {
        "Tomorrow".to_string()
    } else {
        date.format("%A").to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};

    use super::*;
    use crate::raw::RawForecastEntry;

    fn london_payload() -> RawWeather {
        serde_json::from_value(serde_json::json!({
            "main": { "temp": 15.2, "feels_like": 14.0, "humidity": 80, "pressure": 1012 },
            "weather": [{ "description": "light rain", "icon": "10d" }],
            "name": "London",
            "sys": { "country": "GB", "sunrise": 1700000000, "sunset": 1700030000 },
            "wind": { "speed": 3.5 },
            "visibility": 9000
        }))
        .expect("payload should deserialize")
    }

    fn is_one_decimal(s: &str) -> bool {
        let digits = s.strip_prefix('-').unwrap_or(s);
        match digits.split_once('.') {
            Some((int, frac)) => {
                !int.is_empty()
                    && int.chars().all(|c| c.is_ascii_digit())
                    && frac.len() == 1
                    && frac.chars().all(|c| c.is_ascii_digit())
            }
            None => false,
        }
    }

    #[test]
    fn london_scenario() {
        let weather = normalize_current_in(&london_payload(), &Utc).expect("complete payload");

        assert_eq!(weather.city, "London");
        assert_eq!(weather.country, "GB");
        assert_eq!(weather.temp, "15.2");
        assert_eq!(weather.feels_like, "14.0");
        assert_eq!(weather.humidity, 80);
        assert_eq!(weather.description, "light rain");
        assert_eq!(weather.icon, "10d");
        assert_eq!(weather.pressure, 1012);
        assert_eq!(weather.wind_speed, 3.5);
        assert_eq!(weather.visibility, 9.0);
        // 1700000000 = 2023-11-14 22:13:20 UTC
        assert_eq!(weather.sunrise, "10:13 PM");
        assert_eq!(weather.sunset, "06:33 AM");
    }

    #[test]
    fn sun_times_follow_time_zone() {
        let tz = FixedOffset::east_opt(2 * 3600).expect("valid offset");
        let weather = normalize_current_in(&london_payload(), &tz).expect("complete payload");
        assert_eq!(weather.sunrise, "12:13 AM");
        assert_eq!(weather.sunset, "08:33 AM");
    }

    #[test]
    fn temperatures_always_have_one_decimal() {
        for t in [0.0, -0.04, -12.349, 15.0, 15.25, 99.99, 273.15, -40.0, 1e-9] {
            let mut raw = london_payload();
            if let Some(main) = raw.main.as_mut() {
                main.temp = Some(t);
                main.feels_like = Some(t - 1.33);
            }
            let weather = normalize_current_in(&raw, &Utc).expect("complete payload");
            assert!(is_one_decimal(&weather.temp), "bad temp {}", weather.temp);
            assert!(
                is_one_decimal(&weather.feels_like),
                "bad feels_like {}",
                weather.feels_like
            );
        }
    }

    #[test]
    fn missing_fields_are_malformed() {
        let cases: [(&str, fn(&mut RawWeather)); 5] = [
            ("main", |r| r.main = None),
            ("weather[0]", |r| r.weather.clear()),
            ("sys.country", |r| {
                if let Some(sys) = r.sys.as_mut() {
                    sys.country = None;
                }
            }),
            ("visibility", |r| r.visibility = None),
            ("name", |r| r.name = None),
        ];

        for (field, strip) in cases {
            let mut raw = london_payload();
            strip(&mut raw);
            let err = normalize_current_in(&raw, &Utc).unwrap_err();
            assert_eq!(
                err,
                WeatherError::MalformedPayload(format!("missing field `{field}`"))
            );
        }
    }

    #[test]
    fn group_by_day_buckets_in_order() {
        let entry = |dt: i64, temp: f64| RawForecastEntry {
            dt,
            main: Some(crate::raw::RawMain {
                temp: Some(temp),
                ..Default::default()
            }),
            ..Default::default()
        };
        // 2023-11-14 21:00, 2023-11-15 00:00, 03:00, 2023-11-16 00:00 (UTC)
        let forecast = RawForecast {
            city: None,
            list: vec![
                entry(1699995600, 8.0),
                entry(1700006400, 6.5),
                entry(1700017200, 9.0),
                entry(1700092800, 4.0),
            ],
        };

        let days = group_by_day(&forecast, &Utc);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].entries.len(), 1);
        assert_eq!(days[1].entries.len(), 2);
        assert_eq!(days[1].min_temp, 6.5);
        assert_eq!(days[1].max_temp, 9.0);
        assert_eq!(
            days[2].date,
            NaiveDate::from_ymd_opt(2023, 11, 16).expect("valid date")
        );
    }

    #[test]
    fn day_labels() {
        let today = NaiveDate::from_ymd_opt(2023, 11, 14).expect("valid date");
        assert_eq!(day_label(today, today), "Today");
        assert_eq!(
            day_label(today.succ_opt().expect("next day"), today),
            "Tomorrow"
        );
        let friday = NaiveDate::from_ymd_opt(2023, 11, 17).expect("valid date");
        assert_eq!(day_label(friday, today), "Friday");
    }
}
