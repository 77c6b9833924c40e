// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command line configuration.
//!
//! [`Cli`] is the raw clap parser. [`Config::from_cli`] validates it once into an
//! immutable [`Config`] that `main` hands to each component.

use crate::constants::{DEFAULT_DNS_SERVER, DEFAULT_DOCKER_BIN, DEFAULT_NSUPDATE_BIN, DNS_PORT};
use crate::transaction::validate_name;
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// How update transactions reach the DNS server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UpdateMethod {
    /// Pipe the session into the `nsupdate` client
    Nsupdate,
    /// Send TSIG-signed RFC 2136 UPDATE messages directly
    Rfc2136,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact human readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Keep a DNS zone in sync with running Docker containers.
#[derive(Parser, Debug, Clone)]
#[command(name = "docker-ddns", version, about)]
pub struct Cli {
    /// TSIG key file in BIND `key { ... };` format (required unless --dry-run)
    #[arg(short, long, value_name = "PATH")]
    pub key: Option<PathBuf>,

    /// DNS server receiving updates and answering marker queries
    #[arg(short, long, default_value = DEFAULT_DNS_SERVER)]
    pub server: String,

    /// DNS server port
    #[arg(short, long, default_value_t = DNS_PORT)]
    pub port: u16,

    /// Domain container records are created under
    #[arg(short, long)]
    pub domain: String,

    /// Zone named in update sessions (defaults to the domain)
    #[arg(short, long)]
    pub zone: Option<String>,

    /// Log the update sessions instead of submitting them
    #[arg(long)]
    pub dry_run: bool,

    /// Register already running containers before watching events
    #[arg(long)]
    pub catchup: bool,

    /// Update channel
    #[arg(long, value_enum, default_value_t = UpdateMethod::Nsupdate)]
    pub update_method: UpdateMethod,

    /// nsupdate executable
    #[arg(long, default_value = DEFAULT_NSUPDATE_BIN)]
    pub nsupdate_bin: String,

    /// docker executable used for `docker events`
    #[arg(long, default_value = DEFAULT_DOCKER_BIN)]
    pub docker_bin: String,

    /// Read events from a file (`-` for stdin) instead of `docker events`
    #[arg(long, value_name = "PATH")]
    pub events_file: Option<PathBuf>,

    /// Log level filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Append logs to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9153)
    #[arg(long, value_name = "ADDR")]
    pub metrics_bind_address: Option<SocketAddr>,
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// TSIG key file; `None` only in dry-run mode
    pub key_path: Option<PathBuf>,
    /// DNS server receiving updates and marker queries
    pub server: String,
    /// DNS server port
    pub port: u16,
    /// Domain without trailing dot
    pub domain: String,
    /// Zone without trailing dot; equal to or a parent of `domain`
    pub zone: String,
    /// Log transactions instead of submitting them
    pub dry_run: bool,
    /// Register running containers before watching events
    pub catchup: bool,
    /// Channel used to submit updates
    pub update_method: UpdateMethod,
    /// `nsupdate` executable
    pub nsupdate_bin: String,
    /// `docker` executable used for `docker events`
    pub docker_bin: String,
    /// Read events from this file (`-` for stdin) instead of `docker events`
    pub events_file: Option<PathBuf>,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Append logs to this file instead of stdout
    pub log_file: Option<PathBuf>,
    /// Address of the Prometheus metrics endpoint; disabled when `None`
    pub metrics_bind_address: Option<SocketAddr>,
}

impl Config {
    /// Validate parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain or zone is not a valid DNS name, the
    /// domain lies outside the zone, or no key is given outside dry-run mode.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let domain = cli.domain.trim_end_matches('.').to_string();
        validate_name(&domain).with_context(|| format!("Invalid --domain '{}'", cli.domain))?;

        let zone = cli
            .zone
            .as_deref()
            .map_or_else(|| domain.clone(), |z| z.trim_end_matches('.').to_string());
        validate_name(&zone).with_context(|| format!("Invalid --zone '{zone}'"))?;

        if !is_within_zone(&domain, &zone) {
            bail!("Domain '{domain}' is not inside zone '{zone}'");
        }

        if cli.key.is_none() && !cli.dry_run {
            bail!("--key is required unless --dry-run is set");
        }

        if cli.server.trim().is_empty() {
            bail!("--server must not be empty");
        }

        Ok(Self {
            key_path: cli.key,
            server: cli.server,
            port: cli.port,
            domain,
            zone,
            dry_run: cli.dry_run,
            catchup: cli.catchup,
            update_method: cli.update_method,
            nsupdate_bin: cli.nsupdate_bin,
            docker_bin: cli.docker_bin,
            events_file: cli.events_file,
            log_level: cli.log_level,
            log_format: cli.log_format,
            log_file: cli.log_file,
            metrics_bind_address: cli.metrics_bind_address,
        })
    }
}

fn is_within_zone(domain: &str, zone: &str) -> bool {
    let domain = domain.to_ascii_lowercase();
    let zone = zone.to_ascii_lowercase();
    domain == zone || domain.ends_with(&format!(".{zone}"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
