//! HTTP handlers for fishing forecasts

use axum::{
    extract::{Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::Species;
use shared::types::GpsCoordinates;

use crate::error::AppResult;
use crate::services::ForecastReport;
use crate::AppState;

/// Query parameters for a forecast
#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub species: Option<Species>,
}

/// Score and rank the forecast horizon for a location
pub async fn get_forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> AppResult<Json<ForecastReport>> {
    let coordinates = GpsCoordinates::new(query.latitude, query.longitude);
    let species = query.species.unwrap_or(state.config.scoring.default_species);

    let report = state.forecast.forecast(&coordinates, species).await?;
    Ok(Json(report))
}
