// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Event-to-DNS reconciliation.
//!
//! The [`Reconciler`] consumes lifecycle events strictly in order and turns each
//! one into at most one update transaction:
//!
//! - **start** - inspect the container and register `hostname -> ip`, one CNAME
//!   per alias and the alias marker TXT record
//! - **destroy** - read the alias marker back and delete the primary name plus
//!   every alias it lists
//! - anything else is ignored
//!
//! No state is kept between events. Everything is re-derived from the container
//! runtime and the DNS server each time.
//!
//! ## Registration example
//!
//! A container `a3d66b00acc9...` with hostname `mongo1` and name
//! `grumpy_einstein` on domain `example.com` produces:
//!
//! ```text
//! update delete mongo1.example.com.
//! update add mongo1.example.com. 60 A 172.17.0.5
//! update delete grumpy_einstein.example.com.
//! update add grumpy_einstein.example.com. 600 CNAME mongo1.example.com.
//! update delete grumpy-einstein.example.com.
//! update add grumpy-einstein.example.com. 600 CNAME mongo1.example.com.
//! update delete a3d66b00acc9.example.com. TXT
//! update add a3d66b00acc9.example.com. 600 TXT "dockerDDNS-alias:grumpy_einstein:" "dockerDDNS-alias:grumpy-einstein:"
//! ```

use crate::aliases::{encode_alias_marker, AliasResolver};
use crate::constants::{A_RECORD_TTL_SECS, CNAME_RECORD_TTL_SECS, MARKER_RECORD_TTL_SECS};
use crate::errors::{AliasLookupError, ReconcileError, RecordError, RuntimeError};
use crate::events::{parse_event_line, EventAction, EventSource, LifecycleEvent};
use crate::metrics;
use crate::runtime::{ContainerIdentity, ContainerRuntime};
use crate::transaction::{RecordType, UpdateTransaction};
use crate::update::UpdateSubmitter;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const KIND_REGISTRATION: &str = "registration";
const KIND_REMOVAL: &str = "removal";

/// Drives DNS updates from container lifecycle events.
pub struct Reconciler {
    domain: String,
    zone: String,
    server: String,
    port: u16,
    runtime: Arc<dyn ContainerRuntime>,
    aliases: AliasResolver,
    submitter: Arc<dyn UpdateSubmitter>,
}

impl Reconciler {
    /// Create a reconciler writing records under `domain` through updates to
    /// `zone` on `server:port`.
    #[must_use]
    pub fn new(
        domain: &str,
        zone: &str,
        server: &str,
        port: u16,
        runtime: Arc<dyn ContainerRuntime>,
        aliases: AliasResolver,
        submitter: Arc<dyn UpdateSubmitter>,
    ) -> Self {
        Self {
            domain: domain.trim_end_matches('.').to_string(),
            zone: zone.trim_end_matches('.').to_string(),
            server: server.to_string(),
            port,
            runtime,
            aliases,
            submitter,
        }
    }

    /// Consume `source` until it ends or `shutdown` turns true.
    ///
    /// Each event is fully reconciled before the next line is read. Shutdown is
    /// only observed between events.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be read or a fatal reconciliation
    /// error occurs.
    pub async fn run(
        &self,
        source: &mut dyn EventSource,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        info!(
            domain = %self.domain,
            zone = %self.zone,
            channel = self.submitter.channel(),
            "Watching container lifecycle events"
        );

        let mut signal_open = true;
        loop {
            if *shutdown.borrow() {
                info!("Shutdown requested, stopping event loop");
                return Ok(());
            }

            let next = tokio::select! {
                changed = shutdown.changed(), if signal_open => {
                    if changed.is_err() {
                        // Sender gone, no shutdown can arrive anymore
                        signal_open = false;
                    }
                    continue;
                }
                next = source.next_line() => next,
            };

            let Some(line) = next.context("Failed to read lifecycle event stream")? else {
                info!("Event stream ended");
                return Ok(());
            };

            if line.trim().is_empty() {
                continue;
            }

            let Some(event) = parse_event_line(&line) else {
                warn!("Ignoring unrecognized event line: {}", line.trim_end());
                metrics::record_unrecognized_line();
                continue;
            };

            if let Err(e) = self.handle_event(&event).await {
                self.apply_error_policy(&event.action, &event.container_id, e)?;
            }
        }
    }

    /// Register every running container, one at a time in runtime order.
    ///
    /// Returns the number of containers visited.
    ///
    /// # Errors
    ///
    /// Returns an error if the running containers cannot be listed or a fatal
    /// reconciliation error occurs.
    pub async fn catch_up(&self) -> Result<usize, ReconcileError> {
        let container_ids = self.runtime.list_running().await?;
        info!("Catching up {} running containers", container_ids.len());

        for container_id in &container_ids {
            if let Err(e) = self.handle_start(container_id).await {
                self.apply_error_policy(&EventAction::Start, container_id, e)?;
            }
        }

        Ok(container_ids.len())
    }

    /// Reconcile one event.
    ///
    /// # Errors
    ///
    /// Returns the failure unfiltered; the caller applies the error policy.
    pub async fn handle_event(&self, event: &LifecycleEvent) -> Result<(), ReconcileError> {
        metrics::record_event(event.action.as_str());

        match &event.action {
            EventAction::Start => {
                debug!(container_id = %event.container_id, timestamp = ?event.timestamp, "Container started");
                self.handle_start(&event.container_id).await
            }
            EventAction::Destroy => {
                debug!(container_id = %event.container_id, timestamp = ?event.timestamp, "Container destroyed");
                self.handle_destroy(event.short_id()).await
            }
            EventAction::Other(action) => {
                debug!(
                    container_id = %event.container_id,
                    "Ignoring '{}' event", action
                );
                Ok(())
            }
        }
    }

    /// Register the DNS records of a started container.
    ///
    /// A container that no longer exists is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if inspection, validation or submission fails.
    pub async fn handle_start(&self, container_id: &str) -> Result<(), ReconcileError> {
        let identity = match self.runtime.inspect(container_id).await {
            Ok(identity) => identity,
            Err(RuntimeError::NotFound { .. }) => {
                info!(
                    container_id = %container_id,
                    "Container vanished before it could be registered, skipping"
                );
                metrics::record_skipped_start("ContainerNotFound");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let transaction = self.registration_transaction(&identity)?;
        info!(
            container_id = %identity.short_id,
            "Registering {}.{} -> {}",
            identity.hostname,
            self.domain,
            identity.ip
        );
        self.submit(KIND_REGISTRATION, &transaction).await
    }

    /// Remove the DNS records of a destroyed container, given its short id.
    ///
    /// A transient alias lookup failure degrades to removing the primary name
    /// only.
    ///
    /// # Errors
    ///
    /// Returns an error on an unexpected alias lookup failure, invalid record
    /// data, or a failed submission.
    pub async fn handle_destroy(&self, short_id: &str) -> Result<(), ReconcileError> {
        let aliases = match self.aliases.resolve_aliases(short_id, &self.domain).await {
            Ok(aliases) => aliases,
            Err(e @ AliasLookupError::Transient { .. }) => {
                error!(
                    container_id = %short_id,
                    "{}; removing primary record only", e
                );
                metrics::record_alias_lookup_failure("transient");
                BTreeSet::new()
            }
            Err(e @ AliasLookupError::Unexpected { .. }) => {
                metrics::record_alias_lookup_failure("unexpected");
                return Err(e.into());
            }
        };

        let transaction = self.removal_transaction(short_id, &aliases)?;
        info!(
            container_id = %short_id,
            "Removing {}.{} and {} aliases",
            short_id,
            self.domain,
            aliases.len()
        );
        self.submit(KIND_REMOVAL, &transaction).await
    }

    /// Build the registration transaction for a container.
    ///
    /// # Errors
    ///
    /// Returns an error if a name, the IP address or a marker string is invalid.
    pub fn registration_transaction(
        &self,
        identity: &ContainerIdentity,
    ) -> Result<UpdateTransaction, RecordError> {
        let mut transaction = UpdateTransaction::new(&self.server, self.port, &self.zone)?;

        transaction
            .delete_name(&identity.hostname, &self.domain)?
            .add_a(
                &identity.hostname,
                &self.domain,
                A_RECORD_TTL_SECS,
                &identity.ip,
            )?;

        let aliases = container_aliases(identity);
        if aliases.is_empty() {
            return Ok(transaction);
        }

        let target = format!("{}.{}", identity.hostname, self.domain);
        for alias in &aliases {
            transaction
                .delete_name(alias, &self.domain)?
                .add_cname(alias, &self.domain, CNAME_RECORD_TTL_SECS, &target)?;
        }

        let markers: Vec<String> = aliases.iter().map(|a| encode_alias_marker(a)).collect();
        transaction
            .delete_rrset(RecordType::TXT, &identity.short_id, &self.domain)?
            .add_txt(
                &identity.short_id,
                &self.domain,
                MARKER_RECORD_TTL_SECS,
                &markers,
            )?;

        Ok(transaction)
    }

    /// Build the removal transaction for a container.
    ///
    /// Deletes everything at `short_id` (primary record and marker) and at
    /// each alias, in set order.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is invalid.
    pub fn removal_transaction(
        &self,
        short_id: &str,
        aliases: &BTreeSet<String>,
    ) -> Result<UpdateTransaction, RecordError> {
        let mut transaction = UpdateTransaction::new(&self.server, self.port, &self.zone)?;
        transaction.delete_name(short_id, &self.domain)?;
        for alias in aliases {
            transaction.delete_name(alias, &self.domain)?;
        }
        Ok(transaction)
    }

    async fn submit(
        &self,
        kind: &'static str,
        transaction: &UpdateTransaction,
    ) -> Result<(), ReconcileError> {
        match self.submitter.submit(transaction).await {
            Ok(()) => {
                metrics::record_transaction(kind, true);
                Ok(())
            }
            Err(e) => {
                metrics::record_transaction(kind, false);
                Err(e.into())
            }
        }
    }

    /// Log a failed event and decide whether the engine keeps going.
    fn apply_error_policy(
        &self,
        action: &EventAction,
        container_id: &str,
        err: ReconcileError,
    ) -> Result<(), ReconcileError> {
        if err.is_fatal() {
            error!(
                container_id = %container_id,
                reason = err.reason(),
                "Fatal error handling '{}' event: {}",
                action.as_str(),
                err
            );
            return Err(err);
        }

        if *action == EventAction::Start && is_skipped_start(&err) {
            metrics::record_skipped_start(err.reason());
        }

        match &err {
            ReconcileError::Runtime(RuntimeError::Incomplete { .. }) => warn!(
                container_id = %container_id,
                reason = err.reason(),
                "Skipping '{}' event: {}",
                action.as_str(),
                err
            ),
            _ => error!(
                container_id = %container_id,
                reason = err.reason(),
                "Failed to handle '{}' event: {}",
                action.as_str(),
                err
            ),
        }
        Ok(())
    }
}

/// Whether a start failure happened before any transaction was submitted.
fn is_skipped_start(err: &ReconcileError) -> bool {
    matches!(err, ReconcileError::Runtime(_) | ReconcileError::Record(_))
}

/// Aliases a container is registered under besides its hostname.
///
/// The container name is an alias when it differs from the hostname. Such a
/// name containing `_` also gets a hyphenated alias, since underscores are not
/// valid in hostnames. A container named after its hostname has no aliases.
fn container_aliases(identity: &ContainerIdentity) -> Vec<String> {
    let mut aliases = Vec::new();
    if identity.name == identity.hostname {
        return aliases;
    }

    aliases.push(identity.name.clone());
    if identity.name.contains('_') {
        let hyphenated = identity.name.replace('_', "-");
        if hyphenated != identity.hostname {
            aliases.push(hyphenated);
        }
    }

    aliases
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod reconciler_tests;
