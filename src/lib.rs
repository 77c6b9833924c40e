// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # docker-ddns - Dynamic DNS for Docker containers
//!
//! docker-ddns watches the Docker event stream and keeps a BIND9 zone in sync
//! with running containers through dynamic updates (RFC 2136).
//!
//! ## Overview
//!
//! - On container **start**, `<hostname>.<domain>` gets an A record pointing at
//!   the container IP, and the container name (plus a hyphenated variant when
//!   it contains `_`) becomes a CNAME to it.
//! - Aliases are remembered in a TXT marker at `<short_id>.<domain>`.
//! - On container **destroy**, the marker is read back and every name it lists
//!   is removed together with `<short_id>.<domain>`.
//!
//! No state is kept locally: the DNS server and the container runtime are the
//! sources of truth.
//!
//! ## Modules
//!
//! - [`events`] - Event stream sources and the line parser
//! - [`runtime`] - Container inspection through the Docker Engine API
//! - [`transaction`] - Validated update transaction builder
//! - [`update`] - Submitters (nsupdate, RFC 2136, dry-run)
//! - [`aliases`] - Alias marker encoding and lookup
//! - [`reconciler`] - Event-to-DNS reconciliation loop
//! - [`tsig`] - TSIG key file parsing
//! - [`config`], [`logging`], [`metrics`] - Process plumbing
//!
//! ## Example
//!
//! ```rust,no_run
//! use docker_ddns::transaction::UpdateTransaction;
//!
//! let mut txn = UpdateTransaction::new("127.0.0.1", 53, "example.com")?;
//! txn.delete_name("web", "example.com")?
//!     .add_a("web", "example.com", 60, "172.17.0.2")?;
//! println!("{}", txn.to_nsupdate_script());
//! # Ok::<(), docker_ddns::errors::RecordError>(())
//! ```

pub mod aliases;
pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod reconciler;
pub mod runtime;
pub mod transaction;
pub mod tsig;
pub mod update;
