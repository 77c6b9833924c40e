// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use docker_ddns::aliases::{MarkerLookup, MarkerSource};
use docker_ddns::errors::{AliasLookupError, EventStreamError, RuntimeError, UpdateError};
use docker_ddns::events::EventSource;
use docker_ddns::runtime::{ContainerIdentity, ContainerRuntime};
use docker_ddns::transaction::{DnsOperation, OperationKind, RecordType, UpdateTransaction};
use docker_ddns::update::UpdateSubmitter;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Build a 64 character container id from a 12 character prefix
pub fn container_id(short_id: &str) -> String {
    format!("{short_id}{}", "0".repeat(64 - short_id.len()))
}

/// One event line in the `docker events` format
pub fn event_line(id: &str, action: &str) -> String {
    format!("2024-05-01T10:00:00.000000000Z {id}: (from busybox:latest) {action}\n")
}

/// Runtime answering from a fixed set of containers
#[derive(Default)]
pub struct StaticRuntime {
    containers: HashMap<String, ContainerIdentity>,
    running: Vec<String>,
}

impl StaticRuntime {
    pub fn with(mut self, identity: ContainerIdentity) -> Self {
        self.running.push(identity.id.clone());
        self.containers.insert(identity.id.clone(), identity);
        self
    }
}

#[async_trait]
impl ContainerRuntime for StaticRuntime {
    async fn inspect(&self, container_id: &str) -> Result<ContainerIdentity, RuntimeError> {
        self.containers
            .get(container_id)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound {
                container_id: container_id.to_string(),
            })
    }

    async fn list_running(&self) -> Result<Vec<String>, RuntimeError> {
        Ok(self.running.clone())
    }
}

/// In-memory zone applying update transactions and serving marker lookups.
///
/// Records are keyed by absolute name; each name holds a set of add operations.
#[derive(Default)]
pub struct InMemoryZone {
    records: Mutex<BTreeMap<String, Vec<DnsOperation>>>,
    transactions: Mutex<Vec<UpdateTransaction>>,
    fail_lookups: Option<AliasLookupError>,
}

impl InMemoryZone {
    pub fn failing_lookups(err: AliasLookupError) -> Self {
        Self {
            fail_lookups: Some(err),
            ..Default::default()
        }
    }

    /// `(name, type, value)` of every record, sorted by name
    pub fn snapshot(&self) -> Vec<(String, RecordType, String)> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(fqdn, ops)| {
                ops.iter().map(move |op| {
                    (
                        fqdn.clone(),
                        op.record_type.unwrap_or(RecordType::TXT),
                        op.value.clone().unwrap_or_default(),
                    )
                })
            })
            .collect()
    }

    pub fn transactions(&self) -> Vec<UpdateTransaction> {
        self.transactions.lock().unwrap().clone()
    }

    fn apply(&self, transaction: &UpdateTransaction) {
        let mut records = self.records.lock().unwrap();
        for op in transaction.operations() {
            let fqdn = op.fqdn();
            match (op.kind, op.record_type) {
                (OperationKind::Delete, None) => {
                    records.remove(&fqdn);
                }
                (OperationKind::Delete, Some(record_type)) => {
                    if let Some(existing) = records.get_mut(&fqdn) {
                        existing.retain(|r| r.record_type != Some(record_type));
                        if existing.is_empty() {
                            records.remove(&fqdn);
                        }
                    }
                }
                (OperationKind::Add, _) => {
                    let existing = records.entry(fqdn).or_default();
                    if !existing.iter().any(|r| r.record_type == op.record_type && r.value == op.value) {
                        existing.push(op.clone());
                    }
                }
            }
        }
    }
}

#[async_trait]
impl UpdateSubmitter for InMemoryZone {
    async fn submit(&self, transaction: &UpdateTransaction) -> Result<(), UpdateError> {
        self.transactions.lock().unwrap().push(transaction.clone());
        self.apply(transaction);
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "in-memory"
    }
}

#[async_trait]
impl MarkerSource for InMemoryZone {
    async fn lookup_marker(&self, fqdn: &str) -> Result<MarkerLookup, AliasLookupError> {
        if let Some(err) = &self.fail_lookups {
            return Err(err.clone());
        }

        let records = self.records.lock().unwrap();
        let texts: Vec<String> = records
            .get(fqdn)
            .map(|ops| {
                ops.iter()
                    .filter(|op| op.record_type == Some(RecordType::TXT))
                    .flat_map(DnsOperation::txt_strings)
                    .collect()
            })
            .unwrap_or_default();

        if texts.is_empty() {
            Ok(MarkerLookup::Absent)
        } else {
            Ok(MarkerLookup::Found(texts))
        }
    }
}

/// Event source that yields its lines and then blocks forever
pub struct EndlessEventSource {
    lines: Vec<String>,
}

impl EndlessEventSource {
    pub fn new(lines: Vec<String>) -> Self {
        let mut lines = lines;
        lines.reverse();
        Self { lines }
    }
}

#[async_trait]
impl EventSource for EndlessEventSource {
    async fn next_line(&mut self) -> Result<Option<String>, EventStreamError> {
        match self.lines.pop() {
            Some(line) => Ok(Some(line)),
            None => std::future::pending().await,
        }
    }
}
