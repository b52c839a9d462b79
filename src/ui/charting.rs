use echotype::metrics::SessionMetricSample;

/// (seconds, value) points for one metric of the sample log
pub fn chart_points(
    samples: &[SessionMetricSample],
    metric: impl Fn(&SessionMetricSample) -> u32,
) -> Vec<(f64, f64)> {
    samples
        .iter()
        .map(|sample| (sample.elapsed_seconds, metric(sample) as f64))
        .collect()
}

/// Compute X (seconds) and Y (highest value) bounds for a results chart
pub fn compute_chart_params(points: &[(f64, f64)]) -> (f64, f64) {
    let mut highest = 0.0;
    for &(_, value) in points {
        if value > highest {
            highest = value;
        }
    }

    let mut overall_duration = points.last().map_or(1.0, |p| p.0);
    if overall_duration < 1.0 {
        overall_duration = 1.0;
    }

    (overall_duration, highest.round())
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

/// Elapsed time as `m:ss mins`
pub fn format_minutes(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02} mins", total / 60, total % 60)
}
