//! Window and day aggregation of scored samples

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};

use crate::models::{finite, DayContext, DaySummary, ScoredSample, WindowSummary};

/// Smallest trailing window that is still emitted
pub const MIN_WINDOW_SAMPLES: usize = 4;

/// Longest horizon that is summarised
pub const MAX_HORIZON_DAYS: usize = 14;

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn mean_of(samples: &[ScoredSample], field: impl Fn(&ScoredSample) -> Option<f64>) -> Option<f64> {
    mean(samples.iter().filter_map(|s| finite(field(s))))
}

/// Most frequent description, earliest first on ties
fn representative_description(samples: &[ScoredSample]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for s in samples {
        *counts.entry(s.description.as_str()).or_default() += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for s in samples {
        let count = counts[s.description.as_str()];
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((s.description.as_str(), count));
        }
    }
    best.map(|(d, _)| d.to_string()).unwrap_or_default()
}

/// Spacing between consecutive samples, zero with fewer than two
fn cadence(samples: &[ScoredSample]) -> Duration {
    match samples {
        [first, second, ..] => second.sample.timestamp - first.sample.timestamp,
        _ => Duration::zero(),
    }
}

fn summarize_window(window: &[ScoredSample], step: Duration) -> WindowSummary {
    let start = window[0].sample.timestamp;
    let count = window.len();

    WindowSummary {
        start,
        end: start + step * count as i32,
        sample_count: count,
        score: mean(window.iter().map(|s| s.score)).unwrap_or(0.0),
        mean_temperature_c: mean_of(window, |s| s.sample.temperature_c),
        mean_wind_speed_kmh: mean_of(window, |s| s.sample.wind_speed_kmh),
        mean_wind_gusts_kmh: mean_of(window, |s| s.sample.wind_gusts_kmh),
        mean_pressure_hpa: mean_of(window, |s| s.sample.pressure_hpa),
        mean_precipitation_mm: mean_of(window, |s| s.sample.precipitation_mm),
        mean_cloud_cover_percent: mean_of(window, |s| s.sample.cloud_cover_percent),
        mean_humidity_percent: mean_of(window, |s| s.sample.humidity_percent),
        description: representative_description(window),
    }
}

/// Split a day's samples into fixed-size, non-overlapping windows
///
/// A trailing window shorter than `min(MIN_WINDOW_SAMPLES, window_size)` is
/// dropped. Window score is the mean of its sample scores.
pub fn aggregate(day_samples: &[ScoredSample], window_size: usize) -> Vec<WindowSummary> {
    if window_size == 0 || day_samples.is_empty() {
        return Vec::new();
    }

    let step = cadence(day_samples);
    let minimum = MIN_WINDOW_SAMPLES.min(window_size);

    day_samples
        .chunks(window_size)
        .filter(|chunk| chunk.len() >= minimum)
        .map(|chunk| summarize_window(chunk, step))
        .collect()
}

/// Highest-scoring window, earliest on ties
pub fn best_of(windows: &[WindowSummary]) -> Option<&WindowSummary> {
    windows.iter().fold(None, |best: Option<&WindowSummary>, w| match best {
        Some(b) if w.score <= b.score => Some(b),
        _ => Some(w),
    })
}

/// Group scored samples by UTC date and summarise each day
///
/// Days are returned in ascending date order, at most [`MAX_HORIZON_DAYS`].
/// A day without a complete window keeps its samples but has no best window.
pub fn summarize_days(
    scored: Vec<ScoredSample>,
    days: &[DayContext],
    window_size: usize,
) -> Vec<DaySummary> {
    let mut by_date: BTreeMap<NaiveDate, Vec<ScoredSample>> = BTreeMap::new();
    for s in scored {
        by_date.entry(s.sample.date()).or_default().push(s);
    }
    let contexts: HashMap<NaiveDate, &DayContext> = days.iter().map(|d| (d.date, d)).collect();

    by_date
        .into_iter()
        .take(MAX_HORIZON_DAYS)
        .map(|(date, mut samples)| {
            samples.sort_by_key(|s| s.sample.timestamp);
            let windows = aggregate(&samples, window_size);
            let best_window = best_of(&windows).cloned();
            let context = contexts.get(&date);

            DaySummary {
                date,
                best_window,
                windows,
                samples,
                sunrise: context.and_then(|c| c.sunrise),
                sunset: context.and_then(|c| c.sunset),
            }
        })
        .collect()
}

/// Order days by best score descending, earlier date first on ties
///
/// Days without data are left out rather than ranked as zero.
pub fn rank_days(days: &[DaySummary]) -> Vec<&DaySummary> {
    let mut ranked: Vec<&DaySummary> = days.iter().filter(|d| d.best_score().is_some()).collect();
    ranked.sort_by(|a, b| {
        let (sa, sb) = (a.best_score().unwrap_or(0.0), b.best_score().unwrap_or(0.0));
        sb.partial_cmp(&sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.date.cmp(&b.date))
    });
    ranked
}

/// Best window across the whole horizon, earliest on ties
pub fn best_window(days: &[DaySummary]) -> Option<&WindowSummary> {
    let mut days: Vec<&DaySummary> = days.iter().collect();
    days.sort_by_key(|d| d.date);
    days.into_iter()
        .filter_map(|d| d.best_window.as_ref())
        .fold(None, |best: Option<&WindowSummary>, w| match best {
            Some(b) if w.score <= b.score => Some(b),
            _ => Some(w),
        })
}
