// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Container lifecycle event stream.
//!
//! The runtime publishes one event per line:
//!
//! ```text
//! 2014-11-28T15:32:04.000000000+01:00 a3d66b00acc9adbdbdbc91cc664d2d94b6a07cc4295c5cf54fcc595e2aa92a43: (from mongo:latest) start
//! ```
//!
//! [`EventSource`] is the producer abstraction (`next_line` returns `None` at end
//! of stream) and [`parse_event_line`] turns a line into a [`LifecycleEvent`].

use crate::constants::{
    ACTION_DESTROY, ACTION_START, CONTAINER_ID_LEN, DOCKER_EVENTS_FORMAT, SHORT_ID_LEN,
};
use crate::errors::EventStreamError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

/// What happened to the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventAction {
    /// The container started
    Start,
    /// The container was removed
    Destroy,
    /// Any other lifecycle action (die, stop, restart, ...)
    Other(String),
}

impl EventAction {
    fn from_word(word: &str) -> Self {
        match word {
            ACTION_START => Self::Start,
            ACTION_DESTROY => Self::Destroy,
            other => Self::Other(other.to_string()),
        }
    }

    /// The action word as it appears in the stream.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Start => ACTION_START,
            Self::Destroy => ACTION_DESTROY,
            Self::Other(word) => word,
        }
    }
}

/// One parsed line of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// Full 64-character container identifier
    pub container_id: String,
    /// Lifecycle action
    pub action: EventAction,
    /// Event time, when the line starts with a parseable timestamp
    pub timestamp: Option<DateTime<FixedOffset>>,
}

impl LifecycleEvent {
    /// First 12 characters of the container identifier.
    #[must_use]
    pub fn short_id(&self) -> &str {
        &self.container_id[..SHORT_ID_LEN]
    }
}

/// Parse one event line.
///
/// The line must contain a token of 64 lowercase hex characters followed by
/// `:`, and must end with an action word made of lowercase ASCII letters.
/// Returns `None` for anything else.
#[must_use]
pub fn parse_event_line(line: &str) -> Option<LifecycleEvent> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    let id_index = tokens
        .iter()
        .position(|token| token.strip_suffix(':').is_some_and(is_container_id))?;

    let action_index = tokens.len() - 1;
    if action_index <= id_index {
        return None;
    }
    let action = tokens[action_index];
    if action.is_empty() || !action.bytes().all(|b| b.is_ascii_lowercase()) {
        return None;
    }

    let timestamp = if id_index > 0 {
        parse_timestamp(tokens[0])
    } else {
        None
    };

    Some(LifecycleEvent {
        container_id: tokens[id_index][..CONTAINER_ID_LEN].to_string(),
        action: EventAction::from_word(action),
        timestamp,
    })
}

/// True if `value` is a full container identifier.
#[must_use]
pub fn is_container_id(value: &str) -> bool {
    value.len() == CONTAINER_ID_LEN && is_lower_hex(value)
}

fn is_lower_hex(value: &str) -> bool {
    value
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn parse_timestamp(token: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(token) {
        return Some(ts);
    }
    token
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|ts| ts.fixed_offset())
}

/// Producer of raw event lines.
///
/// `Ok(None)` means the underlying source closed; there is no restart.
#[async_trait]
pub trait EventSource: Send {
    /// Wait for the next line.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the source fails.
    async fn next_line(&mut self) -> Result<Option<String>, EventStreamError>;
}

/// Event source over any buffered async reader.
pub struct LineEventSource<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> LineEventSource<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> EventSource for LineEventSource<R> {
    async fn next_line(&mut self) -> Result<Option<String>, EventStreamError> {
        Ok(self.lines.next_line().await?)
    }
}

/// Open a file (or stdin for `-`) as an event source.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub async fn open_event_file(path: &Path) -> Result<Box<dyn EventSource>, EventStreamError> {
    if path.as_os_str() == "-" {
        info!("Reading container events from stdin");
        return Ok(Box::new(LineEventSource::new(BufReader::new(
            tokio::io::stdin(),
        ))));
    }

    info!("Reading container events from {}", path.display());
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|source| EventStreamError::Spawn {
            command: path.display().to_string(),
            source,
        })?;
    Ok(Box::new(LineEventSource::new(BufReader::new(file))))
}

/// Event source reading the stdout of a runtime CLI process.
pub struct CommandEventSource {
    command: String,
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

impl CommandEventSource {
    /// Stream container events from `<docker_bin> events`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started.
    pub fn docker(docker_bin: &str) -> Result<Self, EventStreamError> {
        let args = [
            "events",
            "--filter",
            "type=container",
            "--format",
            DOCKER_EVENTS_FORMAT,
        ];
        Self::spawn(docker_bin, &args)
    }

    /// Spawn `program` with `args` and read its stdout line by line.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started.
    pub fn spawn(program: &str, args: &[&str]) -> Result<Self, EventStreamError> {
        let command = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        debug!("Spawning event source: {}", command);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EventStreamError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| EventStreamError::Spawn {
            command: command.clone(),
            source: std::io::Error::other("stdout was not captured"),
        })?;

        info!("Streaming container events from '{}'", command);
        Ok(Self {
            command,
            child,
            lines: BufReader::new(stdout).lines(),
        })
    }
}

#[async_trait]
impl EventSource for CommandEventSource {
    async fn next_line(&mut self) -> Result<Option<String>, EventStreamError> {
        if let Some(line) = self.lines.next_line().await? {
            return Ok(Some(line));
        }

        match self.child.wait().await {
            Ok(status) if status.success() => {
                info!("Event source '{}' exited: {}", self.command, status);
            }
            Ok(status) => {
                warn!("Event source '{}' exited: {}", self.command, status);
            }
            Err(e) => {
                warn!("Failed to reap event source '{}': {}", self.command, e);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod events_tests;
