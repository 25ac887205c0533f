//! Metrics definitions for the mirror provisioner.
//!
//! All metrics follow Prometheus naming conventions:
//! - `mirror_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code:
//! - `reason`: `SubmitError::reason` values (4)
//! - `field`: `ValidationError::field` values (8)
//! - `status`: success, error
//!
//! No recorder is installed by the CLI; an embedding service installs its
//! own exporter.

use metrics::{counter, histogram};
use std::time::Duration;

/// Record a created mirror pod.
///
/// Metric: `mirror_pods_created_total`
pub fn record_pod_created() {
    counter!("mirror_pods_created_total").increment(1);
}

/// Record a generated name that was already taken.
///
/// Metric: `mirror_name_collisions_total`
pub fn record_name_collision() {
    counter!("mirror_name_collisions_total").increment(1);
}

/// Record a submission that failed for a reason other than a collision,
/// or a collision that exhausted all attempts.
///
/// Metric: `mirror_submission_failures_total`
/// Labels: `reason`
pub fn record_submission_failure(reason: &'static str) {
    counter!("mirror_submission_failures_total", "reason" => reason).increment(1);
}

/// Record a rejected capture request.
///
/// Metric: `mirror_validation_failures_total`
/// Labels: `field`
pub fn record_validation_failure(field: &'static str) {
    counter!("mirror_validation_failures_total", "field" => field).increment(1);
}

/// Record the duration of a single create call.
///
/// Metric: `mirror_submission_duration_seconds`
/// Labels: `status`
pub fn record_submission_duration(success: bool, duration: Duration) {
    let status = if success { "success" } else { "error" };
    histogram!("mirror_submission_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
    use std::collections::HashMap;

    fn counters(snapshotter: &Snapshotter) -> HashMap<String, u64> {
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Counter(v) => Some((key.key().name().to_string(), v)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_counters_are_recorded() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_pod_created();
            record_name_collision();
            record_name_collision();
            record_submission_failure("forbidden");
            record_validation_failure("mirror_type");
        });

        let recorded = counters(&snapshotter);
        assert_eq!(recorded.get("mirror_pods_created_total"), Some(&1));
        assert_eq!(recorded.get("mirror_name_collisions_total"), Some(&2));
        assert_eq!(recorded.get("mirror_submission_failures_total"), Some(&1));
        assert_eq!(recorded.get("mirror_validation_failures_total"), Some(&1));
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        // Falls through to the global no-op recorder.
        record_pod_created();
        record_submission_duration(true, Duration::from_millis(40));
        record_submission_duration(false, Duration::from_millis(5));
    }
}
