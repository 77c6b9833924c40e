// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for docker-ddns.
//!
//! This module provides specialized error types for:
//! - Container runtime inspection (vanished containers, daemon unavailable)
//! - Record validation in the update transaction builder
//! - Alias marker lookups against the DNS server
//! - Update session submission (nsupdate and RFC 2136)
//! - The lifecycle event stream itself
//!
//! Every external call site returns one of these typed errors. Whether a failure
//! is recovered locally or terminates the engine is decided once, in
//! [`ReconcileError::is_fatal`].

use thiserror::Error;

/// Errors returned by the container runtime inspector.
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// The container disappeared between the event firing and the lookup.
    ///
    /// This is an expected race (a short-lived container can be started and
    /// removed before the start event is processed) and is treated as a skip.
    #[error("Container '{container_id}' is no longer known to the runtime")]
    NotFound {
        /// The full container identifier that was looked up
        container_id: String,
    },

    /// The runtime answered but the container lacks data needed to register it
    ///
    /// Returned when the hostname, name or IP address is missing, for example
    /// when a container runs with `--network none`.
    #[error("Container '{container_id}' has no {field}")]
    Incomplete {
        /// The full container identifier
        container_id: String,
        /// Which field was missing
        field: &'static str,
    },

    /// The runtime API could not be reached or returned an unexpected error
    #[error("Container runtime unavailable: {reason}")]
    Unavailable {
        /// Underlying client error
        reason: String,
    },
}

/// Errors raised while building an update transaction.
///
/// These are validation failures: the offending data never reaches the
/// update session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A record or zone name is not a valid DNS name
    #[error("Invalid DNS name '{name}': {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// Record data does not fit the record type (malformed IP, unsafe TXT, etc.)
    #[error("Invalid {record_type} record data for '{name}': {reason}")]
    InvalidRecordData {
        /// The record name the data belongs to
        name: String,
        /// Record type (A, CNAME, TXT)
        record_type: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

/// Errors returned by the alias marker lookup.
///
/// An absent marker is not an error: it resolves to an empty alias set.
#[derive(Error, Debug, Clone)]
pub enum AliasLookupError {
    /// Expected DNS flakiness (timeout, SERVFAIL, REFUSED, malformed answer)
    #[error("Alias marker lookup for '{fqdn}' failed: {reason}")]
    Transient {
        /// The marker name that was queried
        fqdn: String,
        /// Reason for the failure
        reason: String,
    },

    /// Anything that points at a bug rather than at the network
    #[error("Unexpected failure looking up alias marker '{fqdn}': {reason}")]
    Unexpected {
        /// The marker name that was queried
        fqdn: String,
        /// Reason for the failure
        reason: String,
    },
}

/// Errors returned when submitting an update transaction.
#[derive(Error, Debug, Clone)]
pub enum UpdateError {
    /// The DNS server answered the update with a non-NOERROR response code
    #[error("DNS update for zone '{zone}' rejected by server {server}: {code}")]
    Rejected {
        /// Zone named in the update
        zone: String,
        /// Server that rejected the update
        server: String,
        /// Response code returned by the server
        code: String,
    },

    /// The update session could not be completed (process failure, network error)
    #[error("DNS update session for zone '{zone}' on server {server} failed: {reason}")]
    SessionFailed {
        /// Zone named in the update
        zone: String,
        /// Server the update was sent to
        server: String,
        /// Opaque failure description
        reason: String,
    },

    /// The TSIG key material could not be loaded or used
    #[error("Invalid TSIG key '{key}': {reason}")]
    InvalidKey {
        /// Key path or key name
        key: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

/// Errors reading the lifecycle event stream.
#[derive(Error, Debug)]
pub enum EventStreamError {
    /// The event source process could not be started
    #[error("Failed to start event source '{command}': {source}")]
    Spawn {
        /// Command line of the event source
        command: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading a line from the event source failed
    #[error("Failed to read from event source: {0}")]
    Read(#[from] std::io::Error),
}

/// Composite error type returned by the reconciler for a single event.
///
/// This is the boundary where the recoverable-vs-fatal policy is applied.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Runtime inspection error
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Record validation error
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Alias marker lookup error
    #[error(transparent)]
    AliasLookup(#[from] AliasLookupError),

    /// Update submission error
    #[error(transparent)]
    Update(#[from] UpdateError),
}

impl ReconcileError {
    /// Returns true if this error must terminate the engine.
    ///
    /// Only unexpected alias lookup failures are fatal. Every other failure is
    /// logged and the event is considered handled.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AliasLookup(AliasLookupError::Unexpected { .. }))
    }

    /// Returns a short, stable reason code for logs and metrics labels.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Runtime(RuntimeError::NotFound { .. }) => "ContainerNotFound",
            Self::Runtime(RuntimeError::Incomplete { .. }) => "ContainerIncomplete",
            Self::Runtime(RuntimeError::Unavailable { .. }) => "RuntimeUnavailable",

            Self::Record(RecordError::InvalidName { .. }) => "InvalidName",
            Self::Record(RecordError::InvalidRecordData { .. }) => "InvalidRecordData",

            Self::AliasLookup(AliasLookupError::Transient { .. }) => "AliasLookupTransient",
            Self::AliasLookup(AliasLookupError::Unexpected { .. }) => "AliasLookupUnexpected",

            Self::Update(UpdateError::Rejected { .. }) => "UpdateRejected",
            Self::Update(UpdateError::SessionFailed { .. }) => "UpdateSessionFailed",
            Self::Update(UpdateError::InvalidKey { .. }) => "InvalidTsigKey",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
