//! Business logic services for the Fishing Forecast service

pub mod alert_runner;
pub mod collaborators;
pub mod forecast;
pub mod scheduler;

pub use alert_runner::{AlertRunner, BatchSummary, DecisionRecord, ProfileError, RunnerSettings};
pub use collaborators::{
    ConditionSource, InMemoryProfileStore, LogNotificationSink, NotificationSink, ProfileStore,
};
pub use forecast::{ForecastReport, ForecastService};
