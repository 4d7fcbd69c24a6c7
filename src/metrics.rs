//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("dreams_http_requests_total", "Total number of HTTP requests"),
        &["method", "status"]
    ).expect("metric can be created");

    // Ledger Metrics
    pub static ref MESSAGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("dreams_messages_total", "Total number of messages written to the ledger"),
        &["kind"]
    ).expect("metric can be created");
    pub static ref USERS_TOTAL: IntGauge = IntGauge::new(
        "dreams_users_total",
        "Number of registered, non-removed users"
    ).expect("metric can be created");
    pub static ref CHANNELS_TOTAL: IntGauge = IntGauge::new(
        "dreams_channels_total",
        "Number of live channels"
    ).expect("metric can be created");
    pub static ref DMS_TOTAL: IntGauge = IntGauge::new(
        "dreams_dms_total",
        "Number of live direct messages"
    ).expect("metric can be created");

    // Persistence Metrics
    pub static ref SNAPSHOTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("dreams_snapshots_total", "Total number of graph snapshots written"),
        &["status"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("dreams_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Safe to call more than once; repeated registration is ignored.
pub fn init_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(MESSAGES_TOTAL.clone()),
        Box::new(USERS_TOTAL.clone()),
        Box::new(CHANNELS_TOTAL.clone()),
        Box::new(DMS_TOTAL.clone()),
        Box::new(SNAPSHOTS_TOTAL.clone()),
        Box::new(ERRORS_TOTAL.clone()),
    ];

    for collector in collectors {
        if let Err(error) = REGISTRY.register(collector) {
            tracing::debug!(%error, "Metric already registered");
        }
    }

    tracing::info!("Metrics registry initialized");
}

/// Refresh the population gauges from a graph snapshot
pub fn observe_graph(graph: &crate::data::Graph) {
    USERS_TOTAL.set(graph.active_user_count() as i64);
    CHANNELS_TOTAL.set(graph.live_channel_count() as i64);
    DMS_TOTAL.set(graph.live_dm_count() as i64);
}
