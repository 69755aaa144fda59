//! Fishing forecast over the configured horizon

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::aggregation::{best_window, rank_days, summarize_days};
use shared::models::{DaySummary, Species, WindowSummary};
use shared::scoring::Scorer;
use shared::types::GpsCoordinates;
use shared::validation::{validate_samples, validate_window_size};

use crate::error::{AppError, AppResult};
use crate::services::collaborators::ConditionSource;

/// Ranked fishing outlook for one location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub coordinates: GpsCoordinates,
    pub species: Species,
    pub generated_at: DateTime<Utc>,
    /// Days in date order
    pub days: Vec<DaySummary>,
    /// Dates from best to worst; days without a complete window are left out
    pub ranking: Vec<NaiveDate>,
    pub best_window: Option<WindowSummary>,
    pub best_day: Option<NaiveDate>,
    /// Whether tide data contributed to the scores
    pub tide_included: bool,
}

/// Forecast service
pub struct ForecastService {
    source: Arc<dyn ConditionSource>,
    window_size: usize,
}

impl ForecastService {
    pub fn new(source: Arc<dyn ConditionSource>, window_size: usize) -> Self {
        Self {
            source,
            window_size,
        }
    }

    /// Fetch, score and rank the horizon for `coordinates`
    pub async fn forecast(
        &self,
        coordinates: &GpsCoordinates,
        species: Species,
    ) -> AppResult<ForecastReport> {
        if !coordinates.is_valid() {
            return Err(AppError::InvalidInput {
                field: "coordinates".to_string(),
                message: "Latitude must be within ±90 and longitude within ±180".to_string(),
            });
        }
        validate_window_size(self.window_size)?;

        let conditions = self.source.fetch_conditions(coordinates).await?;
        validate_samples(&conditions.samples)?;

        let tide = conditions.tide.as_ref().filter(|t| !t.is_empty());
        let scored = Scorer::new(species).score_series(&conditions.samples, &conditions.days, tide);
        let days = summarize_days(scored, &conditions.days, self.window_size);

        let ranking: Vec<NaiveDate> = rank_days(&days).iter().map(|d| d.date).collect();
        let best = best_window(&days).cloned();

        tracing::debug!(
            "Forecast for {:?}: {} days, best day {:?}",
            coordinates,
            days.len(),
            ranking.first()
        );

        Ok(ForecastReport {
            coordinates: coordinates.clone(),
            species,
            generated_at: Utc::now(),
            best_day: ranking.first().copied(),
            ranking,
            best_window: best,
            tide_included: tide.is_some(),
            days,
        })
    }
}
