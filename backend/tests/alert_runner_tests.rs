//! Alert runner tests
//!
//! Covers:
//! - Cooldown idempotence across batches
//! - Batch isolation when one profile's fetch fails
//! - Active-hours boundaries
//! - Cancellation and shared per-batch fetches

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use fishing_forecast_backend::error::{AppError, AppResult};
use fishing_forecast_backend::services::alert_runner::gate;
use fishing_forecast_backend::services::{
    AlertRunner, ConditionSource, InMemoryProfileStore, NotificationSink, ProfileStore,
    RunnerSettings,
};
use proptest::prelude::*;
use shared::conditions::Conditions;
use shared::models::*;
use shared::types::GpsCoordinates;
use tokio::sync::watch;
use uuid::Uuid;

// ============================================================================
// Test Collaborators
// ============================================================================

/// Condition source with a fetch counter, optional delay and failing points
#[derive(Default)]
struct FakeSource {
    fetches: AtomicUsize,
    delay: Option<Duration>,
    failing: HashSet<String>,
}

impl FakeSource {
    fn failing_at(coordinates: &GpsCoordinates) -> Self {
        Self {
            failing: [coordinates.rounded(2).to_string()].into_iter().collect(),
            ..Default::default()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

fn conditions() -> Conditions {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    // Three days, so every gap the cooldown property draws stays covered
    let samples = (0..288)
        .map(|i| EnvironmentalSample {
            temperature_c: Some(18.0),
            wind_speed_kmh: Some(12.0),
            wind_direction_deg: Some(200.0),
            pressure_hpa: Some(1015.0),
            ..EnvironmentalSample::new(start + ChronoDuration::minutes(15 * i))
        })
        .collect();
    Conditions {
        samples,
        ..Default::default()
    }
}

#[async_trait]
impl ConditionSource for FakeSource {
    async fn fetch_conditions(&self, coordinates: &GpsCoordinates) -> AppResult<Conditions> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(&coordinates.rounded(2).to_string()) {
            return Err(AppError::UpstreamUnavailable("station offline".to_string()));
        }
        Ok(conditions())
    }
}

/// Sink that remembers who was notified
#[derive(Default)]
struct RecordingSink {
    delivered: Mutex<Vec<Uuid>>,
    fail: bool,
}

impl RecordingSink {
    fn delivered(&self) -> Vec<Uuid> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(
        &self,
        profile: &AlertProfile,
        _decision: &FiringDecision,
        _snapshot: &ConditionSnapshot,
    ) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Internal("push gateway down".to_string()));
        }
        self.delivered.lock().unwrap().push(profile.id);
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn coords(lat: &str, lon: &str) -> GpsCoordinates {
    GpsCoordinates::new(lat.parse().unwrap(), lon.parse().unwrap())
}

/// Profile whose trigger matches whenever any conditions are available
fn always_profile(coordinates: GpsCoordinates, cooldown_hours: u32) -> AlertProfile {
    AlertProfile {
        id: Uuid::new_v4(),
        name: "Harbor mouth".to_string(),
        coordinates,
        triggers: vec![Trigger::enabled(TriggerSpec::FishingScore { min_score: 0.0 })],
        logic: LogicMode::And,
        active_hours: None,
        cooldown_hours,
        is_active: true,
        species: Species::General,
    }
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap()
}

struct Harness {
    source: Arc<FakeSource>,
    store: Arc<InMemoryProfileStore>,
    sink: Arc<RecordingSink>,
    runner: AlertRunner,
}

fn harness_with(
    source: FakeSource,
    sink: RecordingSink,
    profiles: Vec<AlertProfile>,
    settings: RunnerSettings,
) -> Harness {
    let source = Arc::new(source);
    let store = Arc::new(InMemoryProfileStore::with_profiles(profiles));
    let sink = Arc::new(sink);
    let runner = AlertRunner::new(source.clone(), store.clone(), sink.clone(), settings);
    Harness {
        source,
        store,
        sink,
        runner,
    }
}

fn harness(profiles: Vec<AlertProfile>) -> Harness {
    harness_with(
        FakeSource::default(),
        RecordingSink::default(),
        profiles,
        RunnerSettings::default(),
    )
}

/// A receiver whose sender is gone never cancels
fn never_cancel() -> watch::Receiver<bool> {
    watch::channel(false).1
}

fn reason(summary: &fishing_forecast_backend::services::BatchSummary, id: Uuid) -> Option<SkipReason> {
    summary.decision_for(id).and_then(|r| r.decision.skip_reason.clone())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Fired at T with a 12h cooldown: T+1h skips, T+13h fires
    #[tokio::test]
    async fn test_cooldown_across_batches() {
        let profile = always_profile(coords("41.36", "-71.48"), 12);
        let id = profile.id;
        let h = harness(vec![profile]);

        let first = h.runner.run_batch(at(6, 0), never_cancel()).await.unwrap();
        assert!(first.decision_for(id).unwrap().decision.triggered);
        assert_eq!(h.store.last_fired(id).await.unwrap(), Some(at(6, 0)));

        let second = h.runner.run_batch(at(7, 0), never_cancel()).await.unwrap();
        assert_eq!(reason(&second, id), Some(SkipReason::Cooldown));

        let third = h
            .runner
            .run_batch(at(6, 0) + ChronoDuration::hours(13), never_cancel())
            .await
            .unwrap();
        assert!(third.decision_for(id).unwrap().decision.triggered);
        assert_eq!(h.sink.delivered(), vec![id, id]);
    }

    /// A failing fetch for profile #2 does not affect #1 and #3
    #[tokio::test]
    async fn test_batch_isolation() {
        let failing = coords("42.00", "-70.00");
        let profiles = vec![
            always_profile(coords("41.00", "-71.00"), 6),
            always_profile(failing.clone(), 6),
            always_profile(coords("43.00", "-69.00"), 6),
        ];
        let ids: Vec<Uuid> = profiles.iter().map(|p| p.id).collect();
        let h = harness_with(
            FakeSource::failing_at(&failing),
            RecordingSink::default(),
            profiles,
            RunnerSettings::default(),
        );

        let summary = h.runner.run_batch(at(12, 0), never_cancel()).await.unwrap();
        assert_eq!(summary.decisions.len(), 3);
        assert!(summary.decision_for(ids[0]).unwrap().decision.triggered);
        assert!(summary.decision_for(ids[2]).unwrap().decision.triggered);
        assert!(matches!(reason(&summary, ids[1]), Some(SkipReason::Error(_))));
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].profile_id, ids[1]);
        assert_eq!(h.store.last_fired(ids[1]).await.unwrap(), None);
    }

    /// Active 06:00-18:00: 05:59 is outside, 06:00 is inside
    #[tokio::test]
    async fn test_active_hours_start_boundary() {
        let mut profile = always_profile(coords("41.36", "-71.48"), 1);
        profile.active_hours = Some(ActiveHours {
            start: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            utc_offset_minutes: 0,
        });
        let id = profile.id;
        let h = harness(vec![profile]);

        let early = h.runner.run_batch(at(5, 59), never_cancel()).await.unwrap();
        assert_eq!(reason(&early, id), Some(SkipReason::OutsideActiveHours));
        assert_eq!(h.source.fetch_count(), 0);

        let open = h.runner.run_batch(at(6, 0), never_cancel()).await.unwrap();
        assert!(open.decision_for(id).unwrap().decision.triggered);
    }

    /// Active 06:00-18:00: 18:00 is still inside, 18:01 is outside
    #[tokio::test]
    async fn test_active_hours_end_boundary() {
        let mut profile = always_profile(coords("41.36", "-71.48"), 1);
        profile.active_hours = Some(ActiveHours {
            start: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            utc_offset_minutes: 0,
        });
        let id = profile.id;

        let h = harness(vec![profile.clone()]);
        let closing = h.runner.run_batch(at(18, 0), never_cancel()).await.unwrap();
        assert!(closing.decision_for(id).unwrap().decision.triggered);

        let h = harness(vec![profile]);
        let late = h.runner.run_batch(at(18, 1), never_cancel()).await.unwrap();
        assert_eq!(reason(&late, id), Some(SkipReason::OutsideActiveHours));
        assert_eq!(h.source.fetch_count(), 0);
    }

    /// Cancelling mid-fetch reports cancelled and has no side effects
    #[tokio::test]
    async fn test_cancellation_never_fires() {
        let profiles = vec![
            always_profile(coords("41.00", "-71.00"), 6),
            always_profile(coords("42.00", "-70.00"), 6),
        ];
        let ids: Vec<Uuid> = profiles.iter().map(|p| p.id).collect();
        let h = harness_with(
            FakeSource::slow(Duration::from_secs(5)),
            RecordingSink::default(),
            profiles,
            RunnerSettings {
                fetch_timeout: Duration::from_secs(30),
                ..RunnerSettings::default()
            },
        );

        let (cancel_tx, cancel_rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel_tx.send(true).ok();
        });

        let summary = h.runner.run_batch(at(12, 0), cancel_rx).await.unwrap();
        assert_eq!(summary.fired_count(), 0);
        for id in ids {
            assert_eq!(reason(&summary, id), Some(SkipReason::Cancelled));
            assert_eq!(h.store.last_fired(id).await.unwrap(), None);
        }
        assert!(h.sink.delivered().is_empty());
    }

    /// A batch started after cancellation skips everything without fetching
    #[tokio::test]
    async fn test_already_cancelled_batch() {
        let profile = always_profile(coords("41.36", "-71.48"), 6);
        let id = profile.id;
        let h = harness(vec![profile]);

        let (_cancel_tx, cancel_rx) = watch::channel(true);
        let summary = h.runner.run_batch(at(12, 0), cancel_rx).await.unwrap();
        assert_eq!(reason(&summary, id), Some(SkipReason::Cancelled));
        assert_eq!(h.source.fetch_count(), 0);
    }

    /// Profiles rounding to the same point share one fetch per batch
    #[tokio::test]
    async fn test_shared_fetch_per_rounded_coordinates() {
        let profiles = vec![
            always_profile(coords("41.361", "-71.481"), 6),
            always_profile(coords("41.359", "-71.479"), 6),
            always_profile(coords("41.36", "-71.48"), 6),
            always_profile(coords("40.00", "-70.00"), 6),
        ];
        let h = harness(profiles);

        let summary = h.runner.run_batch(at(12, 0), never_cancel()).await.unwrap();
        assert_eq!(summary.fired_count(), 4);
        assert_eq!(h.source.fetch_count(), 2);

        // The cache lives for one batch only
        h.store.upsert_profile(always_profile(coords("39.00", "-69.00"), 6)).await.unwrap();
        h.runner.run_batch(at(13, 0), never_cancel()).await.unwrap();
        assert_eq!(h.source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_an_error() {
        let profile = always_profile(coords("41.36", "-71.48"), 6);
        let id = profile.id;
        let h = harness_with(
            FakeSource::slow(Duration::from_secs(5)),
            RecordingSink::default(),
            vec![profile],
            RunnerSettings {
                fetch_timeout: Duration::from_millis(20),
                ..RunnerSettings::default()
            },
        );

        let summary = h.runner.run_batch(at(12, 0), never_cancel()).await.unwrap();
        match reason(&summary, id) {
            Some(SkipReason::Error(message)) => assert!(message.contains("timed out")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(summary.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_inactive_profile_skipped() {
        let mut profile = always_profile(coords("41.36", "-71.48"), 6);
        profile.is_active = false;
        let id = profile.id;
        let h = harness(vec![profile]);

        let summary = h.runner.run_batch(at(12, 0), never_cancel()).await.unwrap();
        assert_eq!(reason(&summary, id), Some(SkipReason::Inactive));
        assert_eq!(h.source.fetch_count(), 0);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_profile_reported() {
        let mut profile = always_profile(coords("41.36", "-71.48"), 6);
        profile.triggers[0].enabled = false;
        let id = profile.id;
        let h = harness(vec![profile]);

        let summary = h.runner.run_batch(at(12, 0), never_cancel()).await.unwrap();
        match reason(&summary, id) {
            Some(SkipReason::Error(message)) => assert!(message.contains("Invalid profile")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(h.source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_no_match_keeps_snapshot() {
        let mut profile = always_profile(coords("41.36", "-71.48"), 6);
        profile.triggers = vec![Trigger::enabled(TriggerSpec::Wind {
            min_speed_kmh: 20.0,
            max_speed_kmh: 40.0,
            direction_center_deg: None,
            direction_tolerance_deg: None,
        })];
        let id = profile.id;
        let h = harness(vec![profile]);

        let summary = h.runner.run_batch(at(12, 0), never_cancel()).await.unwrap();
        let record = summary.decision_for(id).unwrap();
        assert_eq!(record.decision.skip_reason, Some(SkipReason::NoMatch));
        assert_eq!(record.snapshot.as_ref().unwrap().wind_speed_kmh, Some(12.0));
        assert!(h.sink.delivered().is_empty());
    }

    /// The same profile listed twice fires once per batch
    #[tokio::test]
    async fn test_duplicate_profile_fires_once() {
        let profile = always_profile(coords("41.36", "-71.48"), 6);
        let id = profile.id;
        let h = harness(vec![profile.clone(), profile]);

        let summary = h.runner.run_batch(at(12, 0), never_cancel()).await.unwrap();
        assert_eq!(summary.decisions.len(), 2);
        assert_eq!(summary.fired_count(), 1);
        assert_eq!(summary.skipped_count(&SkipReason::Cooldown), 1);
        assert_eq!(h.sink.delivered(), vec![id]);
    }

    #[tokio::test]
    async fn test_delivery_failure_still_fires() {
        let profile = always_profile(coords("41.36", "-71.48"), 6);
        let id = profile.id;
        let h = harness_with(
            FakeSource::default(),
            RecordingSink {
                fail: true,
                ..Default::default()
            },
            vec![profile],
            RunnerSettings::default(),
        );

        let summary = h.runner.run_batch(at(12, 0), never_cancel()).await.unwrap();
        assert!(summary.decision_for(id).unwrap().decision.triggered);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].message.contains("delivery failed"));
        assert_eq!(h.store.last_fired(id).await.unwrap(), Some(at(12, 0)));
    }

    #[tokio::test]
    async fn test_no_profiles_empty_summary() {
        let h = harness(Vec::new());
        let summary = h.runner.run_batch(at(12, 0), never_cancel()).await.unwrap();
        assert!(summary.decisions.is_empty());
        assert!(summary.errors.is_empty());
        assert_eq!(summary.run_at, at(12, 0));
    }

    #[tokio::test]
    async fn test_only_inactive_profiles_empty_summary() {
        let profiles: Vec<_> = ["41.00", "42.00"]
            .iter()
            .map(|lat| {
                let mut profile = always_profile(coords(lat, "-71.00"), 6);
                profile.is_active = false;
                profile
            })
            .collect();
        let h = harness(profiles);

        let summary = h.runner.run_batch(at(12, 0), never_cancel()).await.unwrap();
        assert!(summary.decisions.is_empty());
        assert!(summary.errors.is_empty());
        assert_eq!(summary.run_at, at(12, 0));
        assert_eq!(h.source.fetch_count(), 0);
        assert!(h.sink.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_of_one_completes() {
        let profiles: Vec<_> = (0..5)
            .map(|i| always_profile(coords(&format!("4{}.00", i), "-70.00"), 6))
            .collect();
        let h = harness_with(
            FakeSource::default(),
            RecordingSink::default(),
            profiles,
            RunnerSettings {
                max_concurrency: 1,
                ..RunnerSettings::default()
            },
        );

        let summary = h.runner.run_batch(at(12, 0), never_cancel()).await.unwrap();
        assert_eq!(summary.fired_count(), 5);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Firing again requires the full cooldown to elapse
        #[test]
        fn prop_cooldown_gate(cooldown in 1u32..48, elapsed_minutes in 0i64..(72 * 60)) {
            let profile = always_profile(coords("41.36", "-71.48"), cooldown);
            let fired = at(0, 0);
            let now = fired + ChronoDuration::minutes(elapsed_minutes);

            let skipped = gate(&profile, Some(fired), now) == Some(SkipReason::Cooldown);
            prop_assert_eq!(skipped, elapsed_minutes < i64::from(cooldown) * 60);
        }

        /// Two batches never fire a profile twice inside its cooldown
        #[test]
        fn prop_cooldown_idempotent_across_batches(cooldown in 1u32..24, gap_hours in 0i64..48) {
            let profile = always_profile(coords("41.36", "-71.48"), cooldown);
            let id = profile.id;
            let h = harness(vec![profile]);

            let (first, second) = tokio_test::block_on(async {
                let first = h.runner.run_batch(at(0, 0), never_cancel()).await.unwrap();
                let second = h
                    .runner
                    .run_batch(at(0, 0) + ChronoDuration::hours(gap_hours), never_cancel())
                    .await
                    .unwrap();
                (first, second)
            });

            prop_assert!(first.decision_for(id).unwrap().decision.triggered);
            let fired_again = second.decision_for(id).unwrap().decision.triggered;
            prop_assert_eq!(fired_again, gap_hours >= i64::from(cooldown));
        }
    }
}
