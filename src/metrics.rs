use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Standard word length used for word-per-minute rates
pub const CHARS_PER_WORD: f64 = 5.0;

/// Elapsed time is floored to this many minutes before dividing by it
pub const MIN_ELAPSED_MINUTES: f64 = 0.01;

/// Rounded percentage of typed characters that were correct; 100 before any attempt
pub fn accuracy(typed: usize, errors: usize) -> u32 {
    if typed == 0 {
        return 100;
    }
    let correct = typed.saturating_sub(errors) as f64;
    ((correct / typed as f64) * 100.0).round() as u32
}

pub fn elapsed_minutes(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() / 60.0).max(MIN_ELAPSED_MINUTES)
}

/// Net words per minute from correct characters only, never negative
pub fn net_speed(typed: usize, errors: usize, elapsed: Duration) -> u32 {
    let net_words = (typed as f64 - errors as f64) / CHARS_PER_WORD;
    let rate = net_words / elapsed_minutes(elapsed);
    rate.max(0.0).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveMetrics {
    pub speed: u32,
    pub accuracy: u32,
    pub error_count: usize,
}

impl Default for LiveMetrics {
    fn default() -> Self {
        Self {
            speed: 0,
            accuracy: 100,
            error_count: 0,
        }
    }
}

impl LiveMetrics {
    pub fn compute(typed: usize, errors: usize, elapsed: Duration) -> Self {
        Self {
            speed: net_speed(typed, errors, elapsed),
            accuracy: accuracy(typed, errors),
            error_count: errors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetricSample {
    pub elapsed_seconds: f64,
    pub speed: u32,
    pub accuracy: u32,
}

pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    match (mean(data), data.len()) {
        (Some(data_mean), count) if count > 0 => {
            let variance = data
                .iter()
                .map(|value| {
                    let diff = data_mean - *value;

                    diff * diff
                })
                .sum::<f64>()
                / count as f64;

            Some(variance.sqrt())
        }
        _ => None,
    }
}

/// Standard deviation of the sampled speeds; 0 when nothing was sampled
pub fn consistency(samples: &[SessionMetricSample]) -> f64 {
    let speeds: Vec<f64> = samples.iter().map(|s| s.speed as f64).collect();
    std_dev(&speeds).unwrap_or(0.0)
}
