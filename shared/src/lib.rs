//! Shared domain logic for the Fishing Forecast service
//!
//! Scoring, window aggregation, trigger evaluation and the models they
//! operate on. Everything here is pure and synchronous so it can run in the
//! backend, in tests, and in the browser via WASM.

pub mod aggregation;
pub mod conditions;
pub mod models;
pub mod scoring;
pub mod solunar;
pub mod triggers;
pub mod types;
pub mod validation;

pub use aggregation::{aggregate, best_of, best_window, rank_days, summarize_days};
pub use conditions::{build_snapshot, pressure_trend, Conditions};
pub use models::*;
pub use scoring::{describe, ScoreResult, Scorer, ScoringThresholds};
pub use solunar::{moon_phase_fraction, solunar_period_at};
pub use triggers::{circular_distance, evaluate, trigger_matches};
pub use types::*;
pub use validation::*;
