use anyhow::{anyhow, Context, Result};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::core::AppState;

/// Substring match against the reported condition, first hit wins.
const CONDITION_ICONS: &[(&str, &str)] = &[
    ("thunder", "thunderstorm"),
    ("snow", "snow"),
    ("blizzard", "snow"),
    ("sleet", "sleet"),
    ("drizzle", "rain"),
    ("rain", "rain"),
    ("shower", "rain"),
    ("fog", "fog"),
    ("mist", "fog"),
    ("overcast", "cloudy"),
    ("cloud", "partly-cloudy"),
    ("sunny", "sunny"),
    ("clear", "clear"),
];

fn condition_icon(condition: &str) -> &'static str {
    let lower = condition.to_lowercase();
    CONDITION_ICONS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, icon)| *icon)
        .unwrap_or("partly-cloudy")
}

/// Match `weather [in] LOCATION`.
pub fn detect(query: &str) -> Option<String> {
    let re = regex::Regex::new(r"(?i)^\s*weather\s+(?:in\s+)?(.+?)\s*$").ok()?;
    let caps = re.captures(query)?;
    let location = caps[1].trim().to_string();
    if location.is_empty() {
        None
    } else {
        Some(location)
    }
}

#[derive(Debug, Serialize)]
pub struct WeatherAnswer {
    pub location: String,
    pub temperature_c: f64,
    pub feels_like_c: Option<f64>,
    pub condition: String,
    pub humidity: Option<u32>,
    pub wind_kmh: Option<f64>,
    pub icon: String,
}

pub async fn lookup(state: &AppState, location: &str) -> Result<WeatherAnswer> {
    let url = format!(
        "https://wttr.in/{}?format=j1",
        utf8_percent_encode(location, NON_ALPHANUMERIC)
    );

    let body: serde_json::Value = state
        .http_client
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .await
        .context("weather provider unreachable")?
        .error_for_status()
        .context("weather provider error")?
        .json()
        .await
        .context("weather provider returned malformed json")?;

    let current = body
        .pointer("/current_condition/0")
        .ok_or_else(|| anyhow!("missing current conditions"))?;

    let as_f64 = |key: &str| {
        current
            .get(key)
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<f64>().ok())
    };

    let temperature_c =
        as_f64("temp_C").ok_or_else(|| anyhow!("missing temperature in response"))?;
    let condition = current
        .pointer("/weatherDesc/0/value")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown")
        .to_string();

    // Prefer the resolved area name so "paris" comes back as "Paris, France".
    let resolved = body
        .pointer("/nearest_area/0/areaName/0/value")
        .and_then(|v| v.as_str());
    let country = body
        .pointer("/nearest_area/0/country/0/value")
        .and_then(|v| v.as_str());
    let location = match (resolved, country) {
        (Some(area), Some(country)) if !country.is_empty() => format!("{}, {}", area, country),
        (Some(area), _) => area.to_string(),
        _ => location.to_string(),
    };

    Ok(WeatherAnswer {
        location,
        temperature_c,
        feels_like_c: as_f64("FeelsLikeC"),
        icon: condition_icon(&condition).to_string(),
        condition,
        humidity: as_f64("humidity").map(|h| h as u32),
        wind_kmh: as_f64("windspeedKmph"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_weather_queries() {
        assert_eq!(detect("weather in Paris").as_deref(), Some("Paris"));
        assert_eq!(detect("Weather New York").as_deref(), Some("New York"));
        assert_eq!(detect("weather"), None);
        assert_eq!(detect("what is the weather"), None);
    }

    #[test]
    fn icons_match_by_substring() {
        assert_eq!(condition_icon("Patchy light rain"), "rain");
        assert_eq!(condition_icon("Thundery outbreaks"), "thunderstorm");
        assert_eq!(condition_icon("Partly cloudy"), "partly-cloudy");
        assert_eq!(condition_icon("Sunny"), "sunny");
        assert_eq!(condition_icon("Martian dust storm"), "partly-cloudy");
    }
}
