//! HTTP handlers

pub mod alerts;
pub mod forecast;
pub mod health;

pub use alerts::{evaluate_profile, get_profile, list_profiles, run_batch, upsert_profile};
pub use forecast::get_forecast;
pub use health::health_check;
