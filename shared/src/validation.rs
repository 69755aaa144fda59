//! Input validation for alert profiles and sample series
//!
//! Invalid input is rejected, never coerced.

use thiserror::Error;
use validator::Validate;

use crate::models::{AlertProfile, EnvironmentalSample};

/// Rejected domain input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid samples: {0}")]
    InvalidSamples(String),
}

// ============================================================================
// Alert Profile Validations
// ============================================================================

/// Check every profile invariant (enabled triggers, cooldown range, etc.)
pub fn validate_profile(profile: &AlertProfile) -> Result<(), InputError> {
    profile.validate().map_err(|errors| {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        messages.sort();
        InputError::InvalidProfile(messages.join("; "))
    })
}

// ============================================================================
// Sample Series Validations
// ============================================================================

/// Check that samples are strictly ascending at a fixed cadence
pub fn validate_samples(samples: &[EnvironmentalSample]) -> Result<(), InputError> {
    if samples.len() < 2 {
        return Ok(());
    }

    let cadence = samples[1].timestamp - samples[0].timestamp;
    if cadence <= chrono::Duration::zero() {
        return Err(InputError::InvalidSamples(
            "timestamps must be strictly ascending".to_string(),
        ));
    }

    for pair in samples.windows(2) {
        let step = pair[1].timestamp - pair[0].timestamp;
        if step != cadence {
            return Err(InputError::InvalidSamples(format!(
                "expected a fixed {} minute cadence, found {} minutes at {}",
                cadence.num_minutes(),
                step.num_minutes(),
                pair[1].timestamp
            )));
        }
    }
    Ok(())
}

/// Window size must cover at least one sample
pub fn validate_window_size(window_size: usize) -> Result<(), InputError> {
    if window_size == 0 {
        return Err(InputError::InvalidSamples(
            "window size must be at least one sample".to_string(),
        ));
    }
    Ok(())
}
