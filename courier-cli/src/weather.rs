use chrono::{DateTime, Local};
use courier_core::{Client, RequestDescriptor, RequestError, WeatherCredentials};
use serde::Deserialize;
use serde_json::json;

pub const FORECAST_URL: &str = "https://weatherbit-v1-mashape.p.rapidapi.com/forecast/3hourly";

#[derive(Debug, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub city_name: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub data: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastEntry {
    /// Unix timestamp (seconds).
    pub ts: i64,
    pub temp: f64,
    #[serde(default)]
    pub pop: f64,
    pub weather: Condition,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    pub description: String,
}

impl ForecastEntry {
    pub fn local_time(&self) -> Option<DateTime<Local>> {
        DateTime::from_timestamp(self.ts, 0).map(|utc| utc.with_timezone(&Local))
    }
}

/// 3-hourly forecast for a coordinate. Tracked under `FORECAST_URL`.
pub async fn get_weather(
    client: &Client,
    creds: &WeatherCredentials,
    lat: &str,
    lon: &str,
) -> Result<Forecast, RequestError> {
    let descriptor = RequestDescriptor::get(FORECAST_URL)
        .data(json!({ "lat": lat, "lon": lon }))
        .header("X-RapidAPI-Host", &creds.api_host)
        .header("X-RapidAPI-Key", &creds.api_key);

    client.request(descriptor).await
}

pub fn print_forecast(forecast: &Forecast) {
    println!("{}, {}", forecast.city_name, forecast.country_code);
    for entry in &forecast.data {
        let when = entry
            .local_time()
            .map(|t| t.format("%a %d %b %H:%M").to_string())
            .unwrap_or_else(|| entry.ts.to_string());
        println!(
            "  {when}  {:>6.1}°C  {:>3.0}%  {}",
            entry.temp, entry.pop, entry.weather.description
        );
    }
}
