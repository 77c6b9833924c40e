// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for docker-ddns.
//!
//! All metrics carry the `docker_ddns_` prefix and live in [`METRICS_REGISTRY`].
//!
//! # Metrics Categories
//!
//! - **Event Metrics** - Lifecycle events read from the stream, by action
//! - **Transaction Metrics** - Update transactions submitted, by kind and outcome
//! - **Error Metrics** - Alias lookup failures and skipped registrations
//!
//! # Example
//!
//! ```rust,no_run
//! use docker_ddns::metrics::{gather_metrics, record_event};
//!
//! record_event("start");
//! let text = gather_metrics().unwrap();
//! ```

use crate::constants::{METRICS_NAMESPACE, METRICS_PATH};
use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::get, Router};
use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::LazyLock;
use tracing::{error, info};

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics`.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register_counter_vec(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    let counter = CounterVec::new(opts, labels).expect("metric options are statically valid");
    if let Err(e) = METRICS_REGISTRY.register(Box::new(counter.clone())) {
        error!("Failed to register metric {}: {}", name, e);
    }
    counter
}

// ============================================================================
// Event Metrics
// ============================================================================

/// Total number of recognized lifecycle events
///
/// Labels:
/// - `action`: Event action word (`start`, `destroy`, or any other action)
pub static EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter_vec(
        "events_total",
        "Total number of container lifecycle events by action",
        &["action"],
    )
});

/// Total number of stream lines that did not parse as a lifecycle event
pub static UNRECOGNIZED_LINES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter_vec(
        "unrecognized_lines_total",
        "Total number of event stream lines that were dropped",
        &["source"],
    )
});

// ============================================================================
// Transaction Metrics
// ============================================================================

/// Total number of update transactions
///
/// Labels:
/// - `kind`: `registration` or `removal`
/// - `outcome`: `success` or `error`
pub static TRANSACTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter_vec(
        "transactions_total",
        "Total number of DNS update transactions by kind and outcome",
        &["kind", "outcome"],
    )
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of failed alias marker lookups
///
/// Labels:
/// - `class`: `transient` or `unexpected`
pub static ALIAS_LOOKUP_FAILURES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter_vec(
        "alias_lookup_failures_total",
        "Total number of alias marker lookups that failed by class",
        &["class"],
    )
});

/// Total number of start events that produced no registration
///
/// Labels:
/// - `reason`: Reason code from `ReconcileError::reason`
pub static SKIPPED_STARTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter_vec(
        "skipped_starts_total",
        "Total number of start events skipped by reason",
        &["reason"],
    )
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a recognized lifecycle event
pub fn record_event(action: &str) {
    EVENTS_TOTAL.with_label_values(&[action]).inc();
}

/// Record a dropped stream line
pub fn record_unrecognized_line() {
    UNRECOGNIZED_LINES_TOTAL.with_label_values(&["stream"]).inc();
}

/// Record a submitted transaction
///
/// # Arguments
/// * `kind` - `registration` or `removal`
/// * `success` - Whether the update session succeeded
pub fn record_transaction(kind: &str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    TRANSACTIONS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

/// Record a failed alias lookup
pub fn record_alias_lookup_failure(class: &str) {
    ALIAS_LOOKUP_FAILURES_TOTAL.with_label_values(&[class]).inc();
}

/// Record a skipped start event
pub fn record_skipped_start(reason: &str) {
    SKIPPED_STARTS_TOTAL.with_label_values(&[reason]).inc();
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

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Router exposing the registry at `/metrics`.
pub fn metrics_router() -> Router {
    Router::new().route(METRICS_PATH, get(metrics_handler))
}

/// Serve `/metrics` on `addr` until the process exits.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve_metrics(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics server to {addr}"))?;

    info!("Serving metrics at http://{}{}", addr, METRICS_PATH);
    axum::serve(listener, metrics_router())
        .await
        .context("Metrics server failed")?;

    Ok(())
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
