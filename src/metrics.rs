//! Lightweight metrics helpers for protobridge.
//!
//! Thin wrappers over the `metrics` crate macros. No exporter is embedded; the
//! embedding application installs whichever recorder it wants.
//!
//! Provided metrics:
//! * `protobridge_requests_total` (counter, label `outcome`)
//! * `protobridge_failures_total` (counter, label `stage`)
//! * `protobridge_response_candidate_total` (counter, label `index`)
//! * `protobridge_upstream_duration_seconds` (histogram)
use std::time::Instant;

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::Lazy;

use crate::core::Stage;

pub const REQUESTS_TOTAL: &str = "protobridge_requests_total";
pub const FAILURES_TOTAL: &str = "protobridge_failures_total";
pub const RESPONSE_CANDIDATE_TOTAL: &str = "protobridge_response_candidate_total";
pub const UPSTREAM_DURATION_SECONDS: &str = "protobridge_upstream_duration_seconds";

static DESCRIPTIONS: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        REQUESTS_TOTAL,
        Unit::Count,
        "Total number of requests handled by the proxy, by outcome."
    );
    describe_counter!(
        FAILURES_TOTAL,
        Unit::Count,
        "Requests that failed, by the pipeline stage that failed."
    );
    describe_counter!(
        RESPONSE_CANDIDATE_TOTAL,
        Unit::Count,
        "Position of the response candidate that decoded the upstream body."
    );
    describe_histogram!(
        UPSTREAM_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of requests forwarded to the upstream."
    );
});

/// Count a fully proxied request
pub fn record_success() {
    counter!(REQUESTS_TOTAL, "outcome" => "ok").increment(1);
}

/// Count a failed request against the stage that aborted it
pub fn record_failure(stage: Stage) {
    counter!(REQUESTS_TOTAL, "outcome" => "error").increment(1);
    counter!(FAILURES_TOTAL, "stage" => stage.as_str()).increment(1);
}

/// Candidate positions at or past this share the `other` label
pub const MAX_CANDIDATE_LABEL: usize = 8;

/// Record which response candidate decoded the upstream body
pub fn record_response_candidate(index: usize) {
    counter!(RESPONSE_CANDIDATE_TOTAL, "index" => candidate_label(index)).increment(1);
}

/// Bounded label for a candidate position; the client controls the list length
fn candidate_label(index: usize) -> String {
    if index < MAX_CANDIDATE_LABEL {
        index.to_string()
    } else {
        "other".to_string()
    }
}

/// RAII helper measuring upstream request duration.
pub struct UpstreamTimer {
    start: Instant,
}

impl UpstreamTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for UpstreamTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for UpstreamTimer {
    fn drop(&mut self) {
        histogram!(UPSTREAM_DURATION_SECONDS).record(self.start.elapsed().as_secs_f64());
    }
}

/// Initialize metric descriptions (idempotent).
pub fn init_metrics() -> eyre::Result<()> {
    Lazy::force(&DESCRIPTIONS);
    tracing::debug!("Metric descriptions registered");
    Ok(())
}
