// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Update sessions as RFC 2136 UPDATE messages signed with TSIG.

use super::UpdateSubmitter;
use crate::errors::UpdateError;
use crate::transaction::{DnsOperation, OperationKind, RecordType, UpdateTransaction};
use crate::tsig::{create_tsig_signer, TsigKeyData};
use anyhow::{Context, Result};
use async_trait::async_trait;
use hickory_client::client::{Client, SyncClient};
use hickory_client::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_client::rr::{rdata, DNSClass, Name, RData, Record};
use hickory_client::udp::UdpClientConnection;
use std::net::{Ipv4Addr, ToSocketAddrs};
use std::str::FromStr;
use tracing::{error, info};

/// Sends each transaction as a single UPDATE message over UDP.
#[derive(Debug, Clone)]
pub struct Rfc2136Submitter {
    key_data: TsigKeyData,
}

impl Rfc2136Submitter {
    /// Sign updates with `key_data`.
    #[must_use]
    pub fn new(key_data: TsigKeyData) -> Self {
        Self { key_data }
    }
}

#[async_trait]
impl UpdateSubmitter for Rfc2136Submitter {
    async fn submit(&self, transaction: &UpdateTransaction) -> Result<(), UpdateError> {
        let message = build_update_message(transaction).map_err(|e| {
            UpdateError::SessionFailed {
                zone: transaction.zone().to_string(),
                server: transaction.server().to_string(),
                reason: format!("failed to build UPDATE message: {e:#}"),
            }
        })?;

        let zone = transaction.zone().to_string();
        let server = transaction.server().to_string();
        let port = transaction.port();
        let operation_count = transaction.operations().len();
        let digest = transaction.digest();
        let key_data = self.key_data.clone();

        // Execute DNS update in blocking thread (hickory-client is sync)
        tokio::task::spawn_blocking(move || {
            let session_failed = |reason: String| UpdateError::SessionFailed {
                zone: zone.clone(),
                server: server.clone(),
                reason,
            };

            let server_addr = (server.as_str(), port)
                .to_socket_addrs()
                .map_err(|e| session_failed(format!("cannot resolve server: {e}")))?
                .next()
                .ok_or_else(|| session_failed("server resolved to no address".to_string()))?;

            let conn = UdpClientConnection::new(server_addr)
                .map_err(|e| session_failed(format!("failed to create UDP connection: {e}")))?;
            let signer = create_tsig_signer(&key_data).map_err(|e| UpdateError::InvalidKey {
                key: key_data.name.clone(),
                reason: format!("{e:#}"),
            })?;
            let client = SyncClient::with_tsigner(conn, signer);

            let response = client
                .send(message)
                .into_iter()
                .next()
                .ok_or_else(|| session_failed("no response to UPDATE".to_string()))?
                .map_err(|e| session_failed(format!("failed to send UPDATE: {e}")))?;

            match response.response_code() {
                ResponseCode::NoError => {
                    info!(
                        zone = %zone,
                        digest = %digest,
                        "Submitted {} update operations via RFC 2136",
                        operation_count
                    );
                    Ok(())
                }
                code => {
                    error!(
                        "DNS UPDATE for zone {} rejected by {} with response code: {:?}",
                        zone, server_addr, code
                    );
                    Err(UpdateError::Rejected {
                        zone: zone.clone(),
                        server: server_addr.to_string(),
                        code: format!("{code:?}"),
                    })
                }
            }
        })
        .await
        .map_err(|e| UpdateError::SessionFailed {
            zone: transaction.zone().to_string(),
            server: transaction.server().to_string(),
            reason: format!("update task failed: {e}"),
        })?
    }

    fn channel(&self) -> &'static str {
        "rfc2136"
    }
}

/// Build the UPDATE message for a transaction.
///
/// The zone section names the transaction's zone (class IN, type SOA) and the
/// update section lists one record per operation, in order.
///
/// # Errors
///
/// Returns an error if a name or value cannot be converted to wire format.
pub fn build_update_message(transaction: &UpdateTransaction) -> Result<Message> {
    let zone_name = Name::from_str(&format!("{}.", transaction.zone()))
        .with_context(|| format!("Invalid zone name: {}", transaction.zone()))?;

    let mut message = Message::new();
    message
        .set_id(rand::random::<u16>())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Update)
        .set_recursion_desired(false);

    // Zone section (shares the wire layout of the question section)
    let mut zone = Query::query(zone_name, hickory_client::rr::RecordType::SOA);
    zone.set_query_class(DNSClass::IN);
    message.add_query(zone);

    // Update section (shares the wire layout of the authority section)
    for operation in transaction.operations() {
        message.add_name_server(operation_to_record(operation)?);
    }

    Ok(message)
}

fn operation_to_record(operation: &DnsOperation) -> Result<Record> {
    let fqdn = operation.fqdn();
    let name =
        Name::from_str(&fqdn).with_context(|| format!("Invalid record name: {fqdn}"))?;

    match operation.kind {
        OperationKind::Delete => {
            // Class ANY with empty rdata deletes an RRset, type ANY every RRset at the name
            let record_type = operation
                .record_type
                .map_or(hickory_client::rr::RecordType::ANY, to_hickory_type);
            let mut record = Record::with(name, record_type, 0);
            record.set_dns_class(DNSClass::ANY);
            Ok(record)
        }
        OperationKind::Add => {
            let record_type = operation
                .record_type
                .with_context(|| format!("Add for {fqdn} has no record type"))?;
            let value = operation
                .value
                .as_deref()
                .with_context(|| format!("Add for {fqdn} has no value"))?;
            let ttl = operation.ttl.unwrap_or_default();

            let rdata = match record_type {
                RecordType::A => {
                    let ipv4 = Ipv4Addr::from_str(value)
                        .with_context(|| format!("Invalid IPv4 address: {value}"))?;
                    RData::A(ipv4.into())
                }
                RecordType::CNAME => {
                    let target = Name::from_str(value)
                        .with_context(|| format!("Invalid CNAME target: {value}"))?;
                    RData::CNAME(rdata::CNAME(target))
                }
                RecordType::TXT => RData::TXT(rdata::TXT::new(operation.txt_strings())),
            };

            let mut record = Record::from_rdata(name, ttl, rdata);
            record.set_dns_class(DNSClass::IN);
            Ok(record)
        }
    }
}

fn to_hickory_type(record_type: RecordType) -> hickory_client::rr::RecordType {
    match record_type {
        RecordType::A => hickory_client::rr::RecordType::A,
        RecordType::CNAME => hickory_client::rr::RecordType::CNAME,
        RecordType::TXT => hickory_client::rr::RecordType::TXT,
    }
}

#[cfg(test)]
#[path = "rfc2136_tests.rs"]
mod rfc2136_tests;
