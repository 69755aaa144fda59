//! Tide curve models and phase derivation

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Distance from a high/low event inside which the water is considered slack
pub const SLACK_WINDOW_MINUTES: i64 = 30;

/// One point on the predicted tide curve
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TidePoint {
    pub timestamp: DateTime<Utc>,
    pub height_m: f64,
}

/// Kind of tide turning point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TideEventKind {
    High,
    Low,
}

/// A high or low water event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TideEvent {
    pub kind: TideEventKind,
    pub timestamp: DateTime<Utc>,
    pub height_m: f64,
}

/// Categorical state of the tide cycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TidePhase {
    Incoming,
    Outgoing,
    HighSlack,
    LowSlack,
}

impl TidePhase {
    /// Water is moving (not slack)
    pub fn is_moving(&self) -> bool {
        matches!(self, TidePhase::Incoming | TidePhase::Outgoing)
    }
}

impl std::fmt::Display for TidePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TidePhase::Incoming => write!(f, "incoming"),
            TidePhase::Outgoing => write!(f, "outgoing"),
            TidePhase::HighSlack => write!(f, "high slack"),
            TidePhase::LowSlack => write!(f, "low slack"),
        }
    }
}

/// Tide predictions for a horizon
///
/// `points` and `events` are kept sorted by timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TideState {
    pub points: Vec<TidePoint>,
    pub events: Vec<TideEvent>,
}

impl TideState {
    pub fn new(mut points: Vec<TidePoint>, mut events: Vec<TideEvent>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        events.sort_by_key(|e| e.timestamp);
        Self { points, events }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.events.is_empty()
    }

    /// First event strictly after `at`
    pub fn next_event_after(&self, at: DateTime<Utc>) -> Option<&TideEvent> {
        let idx = self.events.partition_point(|e| e.timestamp <= at);
        self.events.get(idx)
    }

    /// Last event at or before `at`
    pub fn previous_event_before(&self, at: DateTime<Utc>) -> Option<&TideEvent> {
        let idx = self.events.partition_point(|e| e.timestamp <= at);
        idx.checked_sub(1).and_then(|i| self.events.get(i))
    }

    /// Event closest in time to `at`, earlier event on ties
    pub fn nearest_event(&self, at: DateTime<Utc>) -> Option<&TideEvent> {
        match (self.previous_event_before(at), self.next_event_after(at)) {
            (Some(prev), Some(next)) => {
                if next.timestamp - at < at - prev.timestamp {
                    Some(next)
                } else {
                    Some(prev)
                }
            }
            (prev, next) => prev.or(next),
        }
    }

    pub fn time_to_next_event(&self, at: DateTime<Utc>) -> Option<Duration> {
        self.next_event_after(at).map(|e| e.timestamp - at)
    }

    /// Index of the curve point nearest to `at`
    fn nearest_point_index(&self, at: DateTime<Utc>) -> Option<usize> {
        if self.points.is_empty() {
            return None;
        }
        let idx = self.points.partition_point(|p| p.timestamp < at);
        if idx == 0 {
            return Some(0);
        }
        if idx == self.points.len() {
            return Some(idx - 1);
        }
        let before = at - self.points[idx - 1].timestamp;
        let after = self.points[idx].timestamp - at;
        Some(if after < before { idx } else { idx - 1 })
    }

    /// Nearest-neighbor height lookup
    pub fn height_at(&self, at: DateTime<Utc>) -> Option<f64> {
        self.nearest_point_index(at).map(|i| self.points[i].height_m)
    }

    /// Derive the tide phase at `at`
    ///
    /// Slack within [`SLACK_WINDOW_MINUTES`] of the nearest event; otherwise the
    /// direction of the curve around `at`, falling back to the kind of the
    /// next event when there is no curve.
    pub fn phase_at(&self, at: DateTime<Utc>) -> Option<TidePhase> {
        if let Some(event) = self.nearest_event(at) {
            let distance = (event.timestamp - at).num_minutes().abs();
            if distance <= SLACK_WINDOW_MINUTES {
                return Some(match event.kind {
                    TideEventKind::High => TidePhase::HighSlack,
                    TideEventKind::Low => TidePhase::LowSlack,
                });
            }
        }

        if let Some(phase) = self.phase_from_curve(at) {
            return Some(phase);
        }

        self.next_event_after(at).map(|next| match next.kind {
            TideEventKind::High => TidePhase::Incoming,
            TideEventKind::Low => TidePhase::Outgoing,
        })
    }

    fn phase_from_curve(&self, at: DateTime<Utc>) -> Option<TidePhase> {
        let idx = self.nearest_point_index(at)?;
        let (from, to) = if idx + 1 < self.points.len() {
            (self.points[idx], self.points[idx + 1])
        } else if idx > 0 {
            (self.points[idx - 1], self.points[idx])
        } else {
            return None;
        };

        let delta = to.height_m - from.height_m;
        if delta > 0.0 {
            Some(TidePhase::Incoming)
        } else if delta < 0.0 {
            Some(TidePhase::Outgoing)
        } else {
            None
        }
    }

    /// Height range of the tide swing `at` sits in
    pub fn exchange_at(&self, at: DateTime<Utc>) -> Option<f64> {
        let prev = self.previous_event_before(at)?;
        let next = self.next_event_after(at)?;
        Some((next.height_m - prev.height_m).abs())
    }
}
