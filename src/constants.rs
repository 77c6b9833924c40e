// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for docker-ddns.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Container Identity Constants
// ============================================================================

/// Length of a full container identifier (hex characters)
pub const CONTAINER_ID_LEN: usize = 64;

/// Length of the short container identifier used as the primary DNS label
pub const SHORT_ID_LEN: usize = 12;

// ============================================================================
// Event Stream Constants
// ============================================================================

/// Action word emitted by the runtime when a container starts
pub const ACTION_START: &str = "start";

/// Action word emitted by the runtime when a container is removed
pub const ACTION_DESTROY: &str = "destroy";

/// Go template handed to `docker events --format` so every line reads
/// `<timestamp> <64-hex-id>: (from <image>) <action>`
pub const DOCKER_EVENTS_FORMAT: &str = "{{.Time}} {{.ID}}: (from {{.From}}) {{.Status}}";

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Standard DNS port for queries and updates
pub const DNS_PORT: u16 = 53;

/// Default DNS server receiving updates and marker queries
pub const DEFAULT_DNS_SERVER: &str = "127.0.0.1";

/// TTL of the primary A record (1 minute)
pub const A_RECORD_TTL_SECS: u32 = 60;

/// TTL of alias CNAME records (10 minutes)
pub const CNAME_RECORD_TTL_SECS: u32 = 600;

/// TTL of the alias marker TXT record (10 minutes, same as the aliases it tracks)
pub const MARKER_RECORD_TTL_SECS: u32 = 600;

/// Prefix of every alias token stored in the marker TXT record
pub const ALIAS_MARKER_PREFIX: &str = "dockerDDNS-alias:";

/// Terminator of an alias token in the marker TXT record
pub const ALIAS_MARKER_SUFFIX: char = ':';

/// Maximum length of a fully qualified domain name (RFC 1035)
pub const MAX_FQDN_LEN: usize = 253;

/// Maximum length of a single DNS label (RFC 1035)
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum length of one TXT character-string
pub const MAX_TXT_STRING_LEN: usize = 255;

/// TSIG fudge time in seconds (allowed clock skew)
pub const TSIG_FUDGE_TIME_SECS: u64 = 300;

// ============================================================================
// External Binary Constants
// ============================================================================

/// Default container runtime CLI used to stream lifecycle events
pub const DEFAULT_DOCKER_BIN: &str = "docker";

/// Default dynamic update client
pub const DEFAULT_NSUPDATE_BIN: &str = "nsupdate";

// ============================================================================
// Metrics Constants
// ============================================================================

/// Namespace prefix for all metrics (prometheus-safe)
pub const METRICS_NAMESPACE: &str = "docker_ddns";

/// Path the metrics endpoint is served on
pub const METRICS_PATH: &str = "/metrics";
