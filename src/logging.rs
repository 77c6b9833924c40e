// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tracing subscriber setup.
//!
//! Format: timestamp file:line LEVEL message
//! Example: 2025-11-29T23:45:00.123456Z main.rs:49 INFO Watching container lifecycle events
//!
//! `RUST_LOG` wins over `--log-level` when it is set.

use crate::config::LogFormat;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Build the log filter from `RUST_LOG`, falling back to `default_level`.
///
/// # Errors
///
/// Returns an error if `default_level` is not a valid filter directive.
pub fn build_env_filter(default_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("Invalid log level '{default_level}'")),
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the filter is invalid, the log file cannot be opened,
/// or a global subscriber is already installed.
pub fn init_logging(level: &str, format: LogFormat, log_file: Option<&Path>) -> Result<()> {
    let env_filter = build_env_filter(level)?;

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_target(false);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_ansi(ansi).compact().try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod logging_tests;
