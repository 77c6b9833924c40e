// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `metrics.rs`

use super::*;

#[test]
fn test_record_event() {
    record_event("metrics-test-start");

    let counter = EVENTS_TOTAL.with_label_values(&["metrics-test-start"]);
    assert!(counter.get() > 0.0);
}

#[test]
fn test_record_transaction_outcomes() {
    record_transaction("metrics-test", true);
    record_transaction("metrics-test", false);
    record_transaction("metrics-test", false);

    assert!(
        TRANSACTIONS_TOTAL
            .with_label_values(&["metrics-test", "success"])
            .get()
            >= 1.0
    );
    assert!(
        TRANSACTIONS_TOTAL
            .with_label_values(&["metrics-test", "error"])
            .get()
            >= 2.0
    );
}

#[test]
fn test_gather_metrics() {
    record_skipped_start("MetricsGatherTest");
    record_alias_lookup_failure("transient");

    let metrics_text = gather_metrics().unwrap();
    assert!(
        metrics_text.contains("docker_ddns_skipped_starts_total"),
        "Metrics should contain namespace prefix"
    );
    assert!(metrics_text.contains("MetricsGatherTest"));
    assert!(metrics_text.contains("docker_ddns_alias_lookup_failures_total"));
}

#[tokio::test]
async fn test_metrics_handler_returns_text() {
    record_unrecognized_line();

    let (status, body) = metrics_handler().await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("docker_ddns_unrecognized_lines_total"));
}
