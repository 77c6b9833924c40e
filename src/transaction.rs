// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(clippy::must_use_candidate)]

//! Typed dynamic DNS update transactions.
//!
//! An [`UpdateTransaction`] is an ordered list of [`DnsOperation`]s scoped to one
//! `(server, zone)` pair. It is submitted as a single all-or-nothing update
//! session, either as an nsupdate script or as one RFC 2136 UPDATE message.
//!
//! All names and values are validated when an operation is pushed, so nothing
//! that could break out of an nsupdate line (whitespace, quotes, newlines) ever
//! reaches the session.
//!
//! # Example
//!
//! ```rust
//! use docker_ddns::transaction::UpdateTransaction;
//!
//! let mut txn = UpdateTransaction::new("127.0.0.1", 53, "example.com").unwrap();
//! txn.delete_name("web", "example.com").unwrap();
//! txn.add_a("web", "example.com", 60, "172.17.0.5").unwrap();
//!
//! let script = txn.to_nsupdate_script();
//! assert!(script.contains("update delete web.example.com.\n"));
//! assert!(script.contains("update add web.example.com. 60 A 172.17.0.5\n"));
//! assert!(script.ends_with("send\n"));
//! ```

use crate::constants::{DNS_PORT, MAX_FQDN_LEN, MAX_LABEL_LEN, MAX_TXT_STRING_LEN};
use crate::errors::RecordError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::net::Ipv4Addr;

/// DNS record types managed by docker-ddns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// Canonical name (alias) record
    CNAME,
    /// Text record, used for the alias marker
    TXT,
}

impl RecordType {
    /// Returns the record type mnemonic used in update sessions.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::CNAME => "CNAME",
            Self::TXT => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an operation removes or adds records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationKind {
    /// Remove records
    Delete,
    /// Add a record
    Add,
}

/// One line of an update session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsOperation {
    /// Delete or add
    pub kind: OperationKind,
    /// Record type. `None` on a delete removes every RRset at the name.
    pub record_type: Option<RecordType>,
    /// Record name relative to `zone` (e.g. "web")
    pub name: String,
    /// Parent domain of `name` (e.g. "docker.example.com")
    pub zone: String,
    /// Time to live in seconds (adds only)
    pub ttl: Option<u32>,
    /// Record data in presentation format (adds only)
    pub value: Option<String>,
}

impl DnsOperation {
    /// Fully qualified, absolute name of the record (with trailing dot).
    pub fn fqdn(&self) -> String {
        format!("{}.{}.", self.name, self.zone)
    }

    /// The character-strings of a TXT add, unquoted.
    ///
    /// Returns an empty vector for any other operation.
    pub fn txt_strings(&self) -> Vec<String> {
        match (self.kind, self.record_type, self.value.as_deref()) {
            (OperationKind::Add, Some(RecordType::TXT), Some(value)) => value
                .split('"')
                .skip(1)
                .step_by(2)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for DnsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fqdn = self.fqdn();
        match self.kind {
            OperationKind::Delete => match self.record_type {
                Some(record_type) => write!(f, "update delete {fqdn} {record_type}"),
                None => write!(f, "update delete {fqdn}"),
            },
            OperationKind::Add => {
                let ttl = self.ttl.unwrap_or_default();
                let record_type = self.record_type.map_or("", RecordType::as_str);
                let value = self.value.as_deref().unwrap_or_default();
                write!(f, "update add {fqdn} {ttl} {record_type} {value}")
            }
        }
    }
}

/// An ordered, atomic batch of record operations for one zone on one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateTransaction {
    server: String,
    port: u16,
    zone: String,
    operations: Vec<DnsOperation>,
}

impl UpdateTransaction {
    /// Create an empty transaction for `zone` on `server`.
    ///
    /// A trailing dot on the zone is accepted and stripped.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidName`] if the zone is not a valid DNS name
    /// or the server contains characters that cannot appear in a session line.
    pub fn new(server: &str, port: u16, zone: &str) -> Result<Self, RecordError> {
        if server.is_empty() || server.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(RecordError::InvalidName {
                name: server.to_string(),
                reason: "server address must be a single non-empty token".to_string(),
            });
        }
        let zone = zone.trim_end_matches('.');
        validate_name(zone)?;

        Ok(Self {
            server: server.to_string(),
            port,
            zone: zone.to_string(),
            operations: Vec::new(),
        })
    }

    /// Server receiving the update.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Port of the server receiving the update.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Zone named in the update session (without trailing dot).
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Operations in submission order.
    pub fn operations(&self) -> &[DnsOperation] {
        &self.operations
    }

    /// Remove every RRset at `name.domain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting name is invalid.
    pub fn delete_name(&mut self, name: &str, domain: &str) -> Result<&mut Self, RecordError> {
        self.push(OperationKind::Delete, None, name, domain, None, None)
    }

    /// Remove the RRset of `record_type` at `name.domain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting name is invalid.
    pub fn delete_rrset(
        &mut self,
        record_type: RecordType,
        name: &str,
        domain: &str,
    ) -> Result<&mut Self, RecordError> {
        self.push(OperationKind::Delete, Some(record_type), name, domain, None, None)
    }

    /// Add an A record `name.domain -> ipv4`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or `ipv4` is not an IPv4 address.
    pub fn add_a(
        &mut self,
        name: &str,
        domain: &str,
        ttl: u32,
        ipv4: &str,
    ) -> Result<&mut Self, RecordError> {
        let address = ipv4
            .parse::<Ipv4Addr>()
            .map_err(|e| RecordError::InvalidRecordData {
                name: name.to_string(),
                record_type: RecordType::A.to_string(),
                reason: format!("'{ipv4}' is not an IPv4 address: {e}"),
            })?;

        self.push(
            OperationKind::Add,
            Some(RecordType::A),
            name,
            domain,
            Some(ttl),
            Some(address.to_string()),
        )
    }

    /// Add a CNAME record `name.domain -> target`.
    ///
    /// The target is written as an absolute name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or target is invalid.
    pub fn add_cname(
        &mut self,
        name: &str,
        domain: &str,
        ttl: u32,
        target: &str,
    ) -> Result<&mut Self, RecordError> {
        let target = target.trim_end_matches('.');
        validate_name(target).map_err(|e| RecordError::InvalidRecordData {
            name: name.to_string(),
            record_type: RecordType::CNAME.to_string(),
            reason: e.to_string(),
        })?;

        self.push(
            OperationKind::Add,
            Some(RecordType::CNAME),
            name,
            domain,
            Some(ttl),
            Some(format!("{target}.")),
        )
    }

    /// Add a TXT record at `name.domain` holding one character-string per entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid, `texts` is empty, or a string is
    /// too long or contains quotes, backslashes or control characters.
    pub fn add_txt(
        &mut self,
        name: &str,
        domain: &str,
        ttl: u32,
        texts: &[String],
    ) -> Result<&mut Self, RecordError> {
        let invalid = |reason: String| RecordError::InvalidRecordData {
            name: name.to_string(),
            record_type: RecordType::TXT.to_string(),
            reason,
        };

        if texts.is_empty() {
            return Err(invalid("at least one character-string is required".to_string()));
        }
        for text in texts {
            if text.len() > MAX_TXT_STRING_LEN {
                return Err(invalid(format!(
                    "character-string longer than {MAX_TXT_STRING_LEN} bytes"
                )));
            }
            if text.chars().any(|c| c == '"' || c == '\\' || c.is_control()) {
                return Err(invalid(format!("unsafe character in '{}'", text.escape_debug())));
            }
        }

        let value = texts
            .iter()
            .map(|s| format!("\"{s}\""))
            .collect::<Vec<_>>()
            .join(" ");

        self.push(
            OperationKind::Add,
            Some(RecordType::TXT),
            name,
            domain,
            Some(ttl),
            Some(value),
        )
    }

    /// Serialize the transaction into an nsupdate session script.
    ///
    /// The script names the server and zone, lists every operation in order and
    /// ends with the `send` commit marker.
    pub fn to_nsupdate_script(&self) -> String {
        let mut script = if self.port == DNS_PORT {
            format!("server {}\n", self.server)
        } else {
            format!("server {} {}\n", self.server, self.port)
        };
        script.push_str(&format!("zone {}.\n", self.zone));
        for op in &self.operations {
            script.push_str(&op.to_string());
            script.push('\n');
        }
        script.push_str("send\n");
        script
    }

    /// SHA-256 of the transaction's JSON form.
    ///
    /// Identical transactions always produce the same digest, which makes
    /// repeated registrations of the same container easy to spot in logs.
    pub fn digest(&self) -> String {
        calculate_hash(self)
    }

    fn push(
        &mut self,
        kind: OperationKind,
        record_type: Option<RecordType>,
        name: &str,
        domain: &str,
        ttl: Option<u32>,
        value: Option<String>,
    ) -> Result<&mut Self, RecordError> {
        let domain = domain.trim_end_matches('.');
        validate_name(name)?;
        validate_name(&format!("{name}.{domain}"))?;

        self.operations.push(DnsOperation {
            kind,
            record_type,
            name: name.to_string(),
            zone: domain.to_string(),
            ttl,
            value,
        });
        Ok(self)
    }
}

/// Calculate the SHA-256 hash of any serializable value.
///
/// The value is serialized to JSON first; the result is 64 hex characters.
pub fn calculate_hash<T: Serialize>(data: &T) -> String {
    let json = serde_json::to_string(data).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Validate a relative or absolute DNS name (without trailing dot).
///
/// Labels may contain ASCII letters, digits, `-` and `_`; they must be 1 to 63
/// characters long and must not start or end with `-`.
///
/// # Errors
///
/// Returns [`RecordError::InvalidName`] describing the first problem found.
pub fn validate_name(name: &str) -> Result<(), RecordError> {
    let invalid = |reason: String| RecordError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty".to_string()));
    }
    if name.len() > MAX_FQDN_LEN {
        return Err(invalid(format!("longer than {MAX_FQDN_LEN} characters")));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(invalid("empty label".to_string()));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(invalid(format!(
                "label '{label}' longer than {MAX_LABEL_LEN} characters"
            )));
        }
        if let Some(c) = label
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(invalid(format!(
                "character '{}' not allowed in label '{label}'",
                c.escape_debug()
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid(format!(
                "label '{label}' must not start or end with '-'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "transaction_tests.rs"]
mod transaction_tests;
