// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the k8s-dns controller.
//!
//! All metrics carry the prefix `dns_linka_cloud_` (prometheus-safe version of
//! "dns.linka.cloud") and live in [`METRICS_REGISTRY`], served on `/metrics`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Reconciliations, durations and requeues per resource type
//! - **Child Record Metrics** - Records created, updated and deleted by the derivation controllers
//! - **Provider Metrics** - Remote provider operations and their outcomes
//! - **DNS Metrics** - Queries served by the embedded server and the number of zones
//! - **Leader Election Metrics** - Leadership state
//!
//! # Example
//!
//! ```rust,no_run
//! use k8s_dns::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("DNSRecord", std::time::Duration::from_millis(20));
//! ```

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "dns_linka_cloud";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (`DNSRecord`, `Ingress`, `Service`)
/// - `status`: Outcome (`success`, `error`, `requeue`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of requeue operations
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Reason for requeue (`status`, `finalizer`, `activation`, `error`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requeues_total"),
        "Total number of requeue operations by resource type and reason",
    );
    let counter = CounterVec::new(opts, &["resource_type", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of errors by resource type and error category
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by resource type and error category",
    );
    let counter = CounterVec::new(opts, &["resource_type", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Child Record Metrics
// ============================================================================

/// Child records changed by the derivation controllers
///
/// Labels:
/// - `parent_kind`: `Ingress` or `Service`
/// - `operation`: `create`, `update`, `delete`
pub static CHILD_RECORDS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_child_records_total"),
        "Derived DNSRecords changed by parent kind and operation",
    );
    let counter = CounterVec::new(opts, &["parent_kind", "operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Provider Metrics
// ============================================================================

/// Remote provider operations
///
/// Labels:
/// - `provider`: Provider name
/// - `operation`: `get`, `append`, `delete`
/// - `outcome`: `success`, `error`
pub static PROVIDER_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_provider_operations_total"),
        "Remote provider operations by provider, operation and outcome",
    );
    let counter = CounterVec::new(opts, &["provider", "operation", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// DNS Metrics
// ============================================================================

/// Queries answered by the embedded server
///
/// Labels:
/// - `protocol`: `udp` or `tcp`
/// - `qtype`: Query type
/// - `rcode`: Response code
pub static DNS_QUERIES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_dns_queries_total"),
        "DNS queries answered by protocol, type and response code",
    );
    let counter = CounterVec::new(opts, &["protocol", "qtype", "rcode"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Time spent answering DNS queries
pub static DNS_QUERY_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_dns_query_duration_seconds"),
        "Time spent answering DNS queries by protocol",
    )
    .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]);
    let histogram = HistogramVec::new(opts, &["protocol"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Number of zones currently served
pub static ZONES: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new(
        format!("{METRICS_NAMESPACE}_zones"),
        "Number of zones served by the embedded server",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Leader Election Metrics
// ============================================================================

/// Current leader election status
///
/// Labels:
/// - `pod_name`: Name of the pod
///
/// Value: 1 if leader, 0 if follower
pub static LEADER_STATUS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_leader_status"),
        "Current leader election status (1 = leader, 0 = follower)",
    );
    let gauge = GaugeVec::new(opts, &["pod_name"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a reconciliation requeue
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Record an error
///
/// # Arguments
/// * `resource_type` - The kind of resource where error occurred
/// * `error_type` - Category of error (e.g., `api_error`, `validation_error`)
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Record a change to a derived record
pub fn record_child_record(parent_kind: &str, operation: &str) {
    CHILD_RECORDS_TOTAL
        .with_label_values(&[parent_kind, operation])
        .inc();
}

/// Record a remote provider call
pub fn record_provider_operation(provider: &str, operation: &str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    PROVIDER_OPERATIONS_TOTAL
        .with_label_values(&[provider, operation, outcome])
        .inc();
}

/// Record an answered DNS query
pub fn record_dns_query(protocol: &str, qtype: &str, rcode: &str, duration: Duration) {
    DNS_QUERIES_TOTAL
        .with_label_values(&[protocol, qtype, rcode])
        .inc();
    DNS_QUERY_DURATION_SECONDS
        .with_label_values(&[protocol])
        .observe(duration.as_secs_f64());
}

/// Record the number of zones after a rebuild
pub fn record_zone_count(count: usize) {
    ZONES.set(i64::try_from(count).unwrap_or(i64::MAX));
}

/// Record leadership acquired
pub fn record_leader_elected(pod_name: &str) {
    LEADER_STATUS.with_label_values(&[pod_name]).set(1.0);
}

/// Record leadership lost
pub fn record_leader_lost(pod_name: &str) {
    LEADER_STATUS.with_label_values(&[pod_name]).set(0.0);
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation_success() {
        let resource_type = "TestResource";
        record_reconciliation_success(resource_type, Duration::from_millis(500));

        let counter = RECONCILIATION_TOTAL.with_label_values(&[resource_type, "success"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[resource_type]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_requeue() {
        record_reconciliation_requeue("TestRequeue", "status");
        let counter = REQUEUE_TOTAL.with_label_values(&["TestRequeue", "status"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_record_provider_operation() {
        record_provider_operation("test-provider", "append", false);
        let counter =
            PROVIDER_OPERATIONS_TOTAL.with_label_values(&["test-provider", "append", "error"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_record_dns_query() {
        record_dns_query("udp", "TESTQ", "NOERROR", Duration::from_micros(300));
        let counter = DNS_QUERIES_TOTAL.with_label_values(&["udp", "TESTQ", "NOERROR"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation_success("GatherTest", Duration::from_millis(100));
        record_zone_count(3);

        let metrics_text = gather_metrics().unwrap();
        assert!(metrics_text.contains("dns_linka_cloud"));
        assert!(metrics_text.contains("reconciliations_total"));
        assert!(metrics_text.contains("dns_linka_cloud_zones"));
    }
}
