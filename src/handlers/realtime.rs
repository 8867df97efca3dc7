//! Realtime data handlers: weather, time, location
//!
//! All three lean on an IP-based geolocation lookup (ipinfo.io). The
//! lookup is cached for a short TTL so one network hiccup cannot stall
//! every module in a batch, and so a mixed batch does not hit the
//! geolocation API three times.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mini_moka::sync::Cache;
use serde::Deserialize;

use crate::dispatch::Handler;
use crate::{Error, Result};

/// How long one geolocation lookup stays valid
const LOCATION_TTL: Duration = Duration::from_secs(300);

/// Cache key for the single self-location entry
const SELF_LOCATION: &str = "self";

/// Resolved IP-based location
#[derive(Debug, Clone)]
pub struct GeoLocation {
    /// City name, or "Unknown"
    pub city: String,
    /// Region/state
    pub region: String,
    /// Country code
    pub country: String,
    /// Latitude as reported by the geolocation service
    pub latitude: String,
    /// Longitude as reported by the geolocation service
    pub longitude: String,
    /// IANA timezone name
    pub timezone: String,
}

#[derive(Deserialize)]
struct IpInfoResponse {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    loc: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
}

/// Shared HTTP client + location cache for the realtime handlers
pub struct RealtimeClient {
    http: reqwest::Client,
    locations: Cache<String, GeoLocation>,
}

impl RealtimeClient {
    /// Create a realtime client
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            locations: Cache::builder().time_to_live(LOCATION_TTL).build(),
        }
    }

    /// Look up (or reuse) the device's IP-based location
    ///
    /// # Errors
    ///
    /// Returns error if the geolocation service is unreachable or answers
    /// without coordinates
    pub async fn location(&self) -> Result<GeoLocation> {
        if let Some(cached) = self.locations.get(&SELF_LOCATION.to_string()) {
            return Ok(cached);
        }

        let info: IpInfoResponse = self
            .http
            .get("https://ipinfo.io/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let loc = info
            .loc
            .ok_or_else(|| Error::Handler("geolocation answered without coordinates".to_string()))?;
        let (lat, lon) = loc
            .split_once(',')
            .ok_or_else(|| Error::Handler(format!("malformed coordinates: {loc}")))?;

        let location = GeoLocation {
            city: info.city.unwrap_or_else(|| "Unknown".to_string()),
            region: info.region.unwrap_or_default(),
            country: info.country.unwrap_or_default(),
            latitude: lat.trim().to_string(),
            longitude: lon.trim().to_string(),
            timezone: info.timezone.unwrap_or_default(),
        };

        tracing::debug!(city = %location.city, "geolocation resolved");
        self.locations
            .insert(SELF_LOCATION.to_string(), location.clone());
        Ok(location)
    }
}

impl Default for RealtimeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    temperature: f64,
    #[serde(default)]
    windspeed: f64,
    #[serde(default)]
    winddirection: f64,
    #[serde(default)]
    weathercode: u32,
}

/// WEATHER: current conditions at the device's location (open-meteo)
pub struct WeatherHandler {
    client: Arc<RealtimeClient>,
}

impl WeatherHandler {
    /// Create the weather handler
    #[must_use]
    pub fn new(client: Arc<RealtimeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Handler for WeatherHandler {
    async fn handle(&self, _query: &str) -> Result<String> {
        let location = self.client.location().await?;

        let url = format!(
            "https://api.open-meteo.com/v1/forecast?latitude={}&longitude={}&current_weather=true",
            location.latitude, location.longitude
        );
        let forecast: ForecastResponse = self
            .client
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let current = forecast.current_weather;
        Ok(format!(
            "In {}: {}, {:.0} degrees, wind {:.0} kilometers per hour from the {}.",
            location.city,
            describe_weather_code(current.weathercode),
            current.temperature,
            current.windspeed,
            degrees_to_compass(current.winddirection),
        ))
    }
}

/// TIME: local date, time, and timezone
pub struct TimeHandler {
    client: Arc<RealtimeClient>,
}

impl TimeHandler {
    /// Create the time handler
    #[must_use]
    pub fn new(client: Arc<RealtimeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Handler for TimeHandler {
    async fn handle(&self, _query: &str) -> Result<String> {
        let now = chrono::Local::now();
        let mut answer = format!(
            "It is {} on {}.",
            now.format("%I:%M %p"),
            now.format("%A, %d %B %Y"),
        );

        // Timezone is best-effort; the clock answer stands without it.
        if let Ok(location) = self.client.location().await {
            if !location.timezone.is_empty() {
                answer.push_str(&format!(" Timezone: {}.", location.timezone));
            }
        }

        Ok(answer)
    }
}

/// LOCATION: where the device currently is
pub struct LocationHandler {
    client: Arc<RealtimeClient>,
}

impl LocationHandler {
    /// Create the location handler
    #[must_use]
    pub fn new(client: Arc<RealtimeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Handler for LocationHandler {
    async fn handle(&self, _query: &str) -> Result<String> {
        let location = self.client.location().await?;
        Ok(format!(
            "You are in {}, {} ({}), near coordinates {}, {}.",
            location.city, location.region, location.country, location.latitude, location.longitude,
        ))
    }
}

/// Map an open-meteo weather code to a spoken description
fn describe_weather_code(code: u32) -> &'static str {
    match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 => "fog",
        48 => "rime fog",
        51 => "light drizzle",
        53 => "moderate drizzle",
        55 => "heavy drizzle",
        61 => "slight rain",
        63 => "moderate rain",
        65 => "heavy rain",
        71 => "light snow",
        73 => "moderate snow",
        75 => "heavy snow",
        80 => "rain showers",
        81 => "heavy showers",
        82 => "violent rain",
        95 => "a thunderstorm",
        96 => "a storm with hail",
        99 => "a violent storm with hail",
        _ => "an unknown condition",
    }
}

/// Convert wind direction degrees to a compass point
fn degrees_to_compass(degrees: f64) -> &'static str {
    const DIRECTIONS: [&str; 8] = [
        "north",
        "northeast",
        "east",
        "southeast",
        "south",
        "southwest",
        "west",
        "northwest",
    ];
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = (((degrees + 22.5) / 45.0) as usize) % 8;
    DIRECTIONS[index]
}
