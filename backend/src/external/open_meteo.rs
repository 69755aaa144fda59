//! Open-Meteo client for forecast conditions
//!
//! Weather comes from the forecast API at 15-minute resolution, with hourly
//! pressure and cloud cover spread over each hour's quarter-hour samples.
//! Water temperature comes from the marine API and is optional: inland
//! points have none. Tide data is not fetched.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use shared::conditions::Conditions;
use shared::models::{DayContext, EnvironmentalSample};
use shared::types::GpsCoordinates;
use shared::validation::validate_samples;

use crate::config::WeatherConfig;
use crate::error::{AppError, AppResult};
use crate::services::collaborators::ConditionSource;

const MINUTELY_FIELDS: &str = "temperature_2m,apparent_temperature,relative_humidity_2m,\
dew_point_2m,precipitation,wind_speed_10m,wind_direction_10m,wind_gusts_10m,visibility,\
sunshine_duration,cape";
const HOURLY_FIELDS: &str = "pressure_msl,cloud_cover";
const DAILY_FIELDS: &str = "sunrise,sunset,temperature_2m_min,temperature_2m_max";

type Series = Option<Vec<Option<f64>>>;

/// Open-Meteo API client
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
    marine_url: String,
    forecast_days: u32,
}

/// Forecast API response (`timeformat=unixtime`)
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    minutely_15: Option<MinutelySeries>,
    #[serde(default)]
    hourly: Option<HourlySeries>,
    #[serde(default)]
    daily: Option<DailySeries>,
}

#[derive(Debug, Deserialize)]
struct MinutelySeries {
    time: Vec<i64>,
    #[serde(default)]
    temperature_2m: Series,
    #[serde(default)]
    apparent_temperature: Series,
    #[serde(default)]
    relative_humidity_2m: Series,
    #[serde(default)]
    dew_point_2m: Series,
    #[serde(default)]
    precipitation: Series,
    #[serde(default)]
    wind_speed_10m: Series,
    #[serde(default)]
    wind_direction_10m: Series,
    #[serde(default)]
    wind_gusts_10m: Series,
    #[serde(default)]
    visibility: Series,
    #[serde(default)]
    sunshine_duration: Series,
    #[serde(default)]
    cape: Series,
}

#[derive(Debug, Deserialize)]
struct HourlySeries {
    time: Vec<i64>,
    #[serde(default)]
    pressure_msl: Series,
    #[serde(default)]
    cloud_cover: Series,
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    time: Vec<i64>,
    #[serde(default)]
    sunrise: Option<Vec<Option<i64>>>,
    #[serde(default)]
    sunset: Option<Vec<Option<i64>>>,
    #[serde(default)]
    temperature_2m_min: Series,
    #[serde(default)]
    temperature_2m_max: Series,
}

/// Marine API response
#[derive(Debug, Deserialize)]
struct MarineResponse {
    #[serde(default)]
    hourly: Option<MarineHourly>,
}

#[derive(Debug, Deserialize)]
struct MarineHourly {
    time: Vec<i64>,
    #[serde(default)]
    sea_surface_temperature: Series,
}

fn value(series: &Series, index: usize) -> Option<f64> {
    series.as_ref().and_then(|s| s.get(index).copied().flatten())
}

fn timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

impl OpenMeteoClient {
    /// Create a client from the weather configuration
    pub fn new(config: &WeatherConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::Configuration(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_endpoint.trim_end_matches('/').to_string(),
            marine_url: config.marine_endpoint.trim_end_matches('/').to_string(),
            forecast_days: config.forecast_days,
        })
    }

    /// Fetch the raw forecast for a location
    pub async fn get_forecast(&self, coordinates: &GpsCoordinates) -> AppResult<ForecastResponse> {
        let url = format!(
            "{}/forecast?latitude={}&longitude={}&minutely_15={}&hourly={}&daily={}\
             &timezone=UTC&timeformat=unixtime&wind_speed_unit=kmh&forecast_days={}",
            self.base_url,
            coordinates.latitude,
            coordinates.longitude,
            MINUTELY_FIELDS,
            HOURLY_FIELDS,
            DAILY_FIELDS,
            self.forecast_days
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Forecast request failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamUnavailable(format!(
                "Forecast API error: {} - {}",
                status, body
            )));
        }

        response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to parse forecast response: {}", e))
        })
    }

    /// Sea surface temperature nearest to now, `None` inland
    pub async fn get_sea_surface_temperature(
        &self,
        coordinates: &GpsCoordinates,
    ) -> AppResult<Option<f64>> {
        let url = format!(
            "{}/marine?latitude={}&longitude={}&hourly=sea_surface_temperature\
             &timezone=UTC&timeformat=unixtime&forecast_days=1",
            self.marine_url, coordinates.latitude, coordinates.longitude
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Marine request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "Marine API error: {}",
                response.status()
            )));
        }

        let data: MarineResponse = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to parse marine response: {}", e))
        })?;

        Ok(nearest_sea_temperature(&data, Utc::now()))
    }
}

/// Convert an Open-Meteo forecast into scorer input
pub fn convert_forecast(data: ForecastResponse) -> Conditions {
    let hourly_index: HashMap<i64, usize> = data
        .hourly
        .as_ref()
        .map(|h| h.time.iter().enumerate().map(|(i, t)| (*t, i)).collect())
        .unwrap_or_default();

    let samples = data
        .minutely_15
        .as_ref()
        .map(|m| {
            m.time
                .iter()
                .enumerate()
                .filter_map(|(i, t)| {
                    let ts = timestamp(*t)?;
                    let hour = hourly_index
                        .get(&(t - t.rem_euclid(3600)))
                        .copied()
                        .zip(data.hourly.as_ref());

                    Some(EnvironmentalSample {
                        timestamp: ts,
                        temperature_c: value(&m.temperature_2m, i),
                        apparent_temperature_c: value(&m.apparent_temperature, i),
                        humidity_percent: value(&m.relative_humidity_2m, i),
                        dew_point_c: value(&m.dew_point_2m, i),
                        precipitation_mm: value(&m.precipitation, i),
                        pressure_hpa: hour.and_then(|(j, h)| value(&h.pressure_msl, j)),
                        cloud_cover_percent: hour.and_then(|(j, h)| value(&h.cloud_cover, j)),
                        wind_speed_kmh: value(&m.wind_speed_10m, i),
                        wind_direction_deg: value(&m.wind_direction_10m, i),
                        wind_gusts_kmh: value(&m.wind_gusts_10m, i),
                        visibility_m: value(&m.visibility, i),
                        sunshine_duration_s: value(&m.sunshine_duration, i),
                        cape_j_kg: value(&m.cape, i),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let days = data
        .daily
        .as_ref()
        .map(|d| {
            d.time
                .iter()
                .enumerate()
                .filter_map(|(i, t)| {
                    let date = timestamp(*t)?.date_naive();
                    let event = |series: &Option<Vec<Option<i64>>>| {
                        series
                            .as_ref()
                            .and_then(|s| s.get(i).copied().flatten())
                            .and_then(timestamp)
                    };
                    Some(DayContext {
                        date,
                        sunrise: event(&d.sunrise),
                        sunset: event(&d.sunset),
                        temperature_min_c: value(&d.temperature_2m_min, i),
                        temperature_max_c: value(&d.temperature_2m_max, i),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Conditions {
        samples,
        days,
        tide: None,
        water_temperature_c: None,
    }
}

fn nearest_sea_temperature(data: &MarineResponse, now: DateTime<Utc>) -> Option<f64> {
    let hourly = data.hourly.as_ref()?;
    hourly
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            let v = value(&hourly.sea_surface_temperature, i).filter(|v| v.is_finite())?;
            Some(((t - now.timestamp()).abs(), v))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, v)| v)
}

#[async_trait]
impl ConditionSource for OpenMeteoClient {
    async fn fetch_conditions(&self, coordinates: &GpsCoordinates) -> AppResult<Conditions> {
        let (forecast, water) = tokio::join!(
            self.get_forecast(coordinates),
            self.get_sea_surface_temperature(coordinates)
        );

        let mut conditions = convert_forecast(forecast?);
        validate_samples(&conditions.samples)
            .map_err(|e| AppError::UpstreamUnavailable(e.to_string()))?;

        conditions.water_temperature_c = match water {
            Ok(temperature) => temperature,
            Err(e) => {
                tracing::debug!("No water temperature for {:?}: {}", coordinates, e);
                None
            }
        };

        tracing::debug!(
            "Fetched {} samples over {} days",
            conditions.samples.len(),
            conditions.days.len()
        );
        Ok(conditions)
    }
}
