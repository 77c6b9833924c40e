// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Alias discovery through the marker TXT record.
//!
//! When a container registers aliases (CNAMEs), a TXT record is written at
//! `<short_id>.<domain>` with one `dockerDDNS-alias:<alias>:` string per alias.
//! At removal time that marker is the only way to find the aliases again,
//! since the engine keeps no local state.

use crate::constants::{ALIAS_MARKER_PREFIX, ALIAS_MARKER_SUFFIX};
use crate::errors::AliasLookupError;
use crate::transaction::validate_name;
use async_trait::async_trait;
use hickory_client::client::{Client, SyncClient};
use hickory_client::op::ResponseCode;
use hickory_client::rr::{DNSClass, Name, RData, RecordType};
use hickory_client::udp::UdpClientConnection;
use std::collections::BTreeSet;
use std::net::ToSocketAddrs;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a successful marker query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerLookup {
    /// TXT character-strings found at the marker name
    Found(Vec<String>),
    /// No marker exists (NXDOMAIN or no TXT answer)
    Absent,
}

/// Where marker TXT records are read from.
#[async_trait]
pub trait MarkerSource: Send + Sync {
    /// Query the TXT record at `fqdn`.
    ///
    /// # Errors
    ///
    /// Returns [`AliasLookupError::Transient`] for DNS failures and malformed
    /// answers, [`AliasLookupError::Unexpected`] for anything else.
    async fn lookup_marker(&self, fqdn: &str) -> Result<MarkerLookup, AliasLookupError>;
}

/// [`MarkerSource`] querying a DNS server over UDP with hickory-client.
#[derive(Debug, Clone)]
pub struct DnsMarkerSource {
    server: String,
    port: u16,
}

impl DnsMarkerSource {
    /// Query `server:port` for markers.
    #[must_use]
    pub fn new(server: &str, port: u16) -> Self {
        Self {
            server: server.to_string(),
            port,
        }
    }
}

#[async_trait]
impl MarkerSource for DnsMarkerSource {
    async fn lookup_marker(&self, fqdn: &str) -> Result<MarkerLookup, AliasLookupError> {
        let fqdn_str = fqdn.to_string();
        let server_str = self.server.clone();
        let port = self.port;

        let transient = {
            let fqdn = fqdn_str.clone();
            move |reason: String| AliasLookupError::Transient {
                fqdn: fqdn.clone(),
                reason,
            }
        };

        // Execute DNS query in blocking thread (hickory-client is sync)
        tokio::task::spawn_blocking(move || {
            let server_addr = (server_str.as_str(), port)
                .to_socket_addrs()
                .map_err(|e| transient(format!("cannot resolve server {server_str}: {e}")))?
                .next()
                .ok_or_else(|| transient(format!("no address for server {server_str}")))?;

            let name = Name::from_str(&fqdn_str).map_err(|e| AliasLookupError::Unexpected {
                fqdn: fqdn_str.clone(),
                reason: format!("invalid query name: {e}"),
            })?;

            let conn = UdpClientConnection::new(server_addr)
                .map_err(|e| transient(format!("failed to create UDP connection: {e}")))?;
            let client = SyncClient::new(conn);

            let response = client
                .query(&name, DNSClass::IN, RecordType::TXT)
                .map_err(|e| transient(format!("query to {server_addr} failed: {e}")))?;

            match response.response_code() {
                ResponseCode::NoError => {}
                ResponseCode::NXDomain => return Ok(MarkerLookup::Absent),
                code => return Err(transient(format!("server answered {code:?}"))),
            }

            let mut texts = Vec::new();
            for record in response
                .answers()
                .iter()
                .filter(|r| r.record_type() == RecordType::TXT)
            {
                if let Some(RData::TXT(txt)) = record.data() {
                    for bytes in txt.txt_data() {
                        let text = String::from_utf8(bytes.to_vec())
                            .map_err(|_| transient("TXT answer is not valid UTF-8".to_string()))?;
                        texts.push(text);
                    }
                }
            }

            if texts.is_empty() {
                Ok(MarkerLookup::Absent)
            } else {
                Ok(MarkerLookup::Found(texts))
            }
        })
        .await
        .map_err(|e| AliasLookupError::Unexpected {
            fqdn: fqdn.to_string(),
            reason: format!("lookup task failed: {e}"),
        })?
    }
}

/// Resolves the aliases registered alongside a container's primary record.
#[derive(Clone)]
pub struct AliasResolver {
    source: Arc<dyn MarkerSource>,
}

impl AliasResolver {
    /// Resolve aliases from `source`.
    pub fn new(source: Arc<dyn MarkerSource>) -> Self {
        Self { source }
    }

    /// Aliases recorded in the marker at `<short_id>.<domain>`.
    ///
    /// An absent marker yields an empty set. Tokens that are not valid DNS
    /// labels are ignored with a warning.
    ///
    /// # Errors
    ///
    /// Propagates the [`AliasLookupError`] of the marker query unchanged; the
    /// caller decides whether it is recoverable.
    pub async fn resolve_aliases(
        &self,
        short_id: &str,
        domain: &str,
    ) -> Result<BTreeSet<String>, AliasLookupError> {
        let fqdn = format!("{short_id}.{}.", domain.trim_end_matches('.'));

        let texts = match self.source.lookup_marker(&fqdn).await? {
            MarkerLookup::Found(texts) => texts,
            MarkerLookup::Absent => {
                debug!("No alias marker at {}", fqdn);
                return Ok(BTreeSet::new());
            }
        };

        let mut aliases = BTreeSet::new();
        for alias in texts.iter().flat_map(|text| parse_alias_marker(text)) {
            match validate_name(&alias) {
                Ok(()) => {
                    aliases.insert(alias);
                }
                Err(e) => warn!("Ignoring alias from marker {}: {}", fqdn, e),
            }
        }

        debug!("Alias marker {} lists {:?}", fqdn, aliases);
        Ok(aliases)
    }
}

/// Encode one alias as a marker token.
#[must_use]
pub fn encode_alias_marker(alias: &str) -> String {
    format!("{ALIAS_MARKER_PREFIX}{alias}{ALIAS_MARKER_SUFFIX}")
}

/// Extract every `dockerDDNS-alias:<alias>:` token embedded in `text`.
///
/// Unterminated or empty tokens are skipped.
#[must_use]
pub fn parse_alias_marker(text: &str) -> Vec<String> {
    let mut aliases = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(ALIAS_MARKER_PREFIX) {
        let after_prefix = &rest[start + ALIAS_MARKER_PREFIX.len()..];
        let Some(end) = after_prefix.find(ALIAS_MARKER_SUFFIX) else {
            break;
        };
        let alias = &after_prefix[..end];
        if !alias.is_empty() {
            aliases.push(alias.to_string());
        }
        rest = &after_prefix[end + ALIAS_MARKER_SUFFIX.len_utf8()..];
    }

    aliases
}

#[cfg(test)]
#[path = "aliases_tests.rs"]
mod aliases_tests;
