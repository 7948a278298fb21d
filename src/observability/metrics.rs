//! Metrics collection and exposition.
//!
//! # Metrics
//! - `flv_requests_total{method,status,origin}` (counter): requests served
//! - `flv_request_duration_seconds` (histogram): time to response head
//! - `flv_seek_decisions_total{outcome}` (counter): accept or decline reason
//! - `flv_seek_bytes_skipped_total` (counter): origin bytes elided by seeks
//! - `flv_body_bytes_sent_total` (counter): body payload handed to clients
//! - `flv_cache_lookups_total{result}` (counter): upstream cache hits and misses
//!
//! Recording is a no-op until `init_metrics` installs the recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Latency buckets for a media server: most heads are immediate, upstream
/// fetches into the cache can take seconds.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = match PrometheusBuilder::new().set_buckets(LATENCY_BUCKETS) {
        Ok(builder) => builder.with_http_listener(addr),
        Err(e) => {
            tracing::error!(error = %e, "Invalid histogram buckets, metrics disabled");
            return;
        }
    };

    if let Err(e) = builder.install() {
        tracing::error!(error = %e, "Failed to install Prometheus exporter");
        return;
    }

    describe_counter!("flv_requests_total", "Total number of requests served");
    describe_histogram!(
        "flv_request_duration_seconds",
        "Time from request to response head in seconds"
    );
    describe_counter!(
        "flv_seek_decisions_total",
        "Seek requests by outcome (accept or decline reason)"
    );
    describe_counter!(
        "flv_seek_bytes_skipped_total",
        "Origin body bytes elided by start offsets"
    );
    describe_counter!(
        "flv_body_bytes_sent_total",
        "Body bytes handed to clients"
    );
    describe_counter!(
        "flv_cache_lookups_total",
        "Upstream cache lookups by result"
    );

    tracing::info!(address = %addr, "Metrics exporter listening");
}

pub fn record_request(method: &str, status: u16, origin: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("origin", origin.to_string()),
    ];
    counter!("flv_requests_total", &labels).increment(1);
    histogram!("flv_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_seek_decision(outcome: &'static str) {
    counter!("flv_seek_decisions_total", "outcome" => outcome).increment(1);
}

pub fn record_seek_bytes_skipped(bytes: u64) {
    if bytes > 0 {
        counter!("flv_seek_bytes_skipped_total").increment(bytes);
    }
}

pub fn record_body_bytes(bytes: u64) {
    if bytes > 0 {
        counter!("flv_body_bytes_sent_total").increment(bytes);
    }
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("flv_cache_lookups_total", "result" => result).increment(1);
}
