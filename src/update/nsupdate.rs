// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Update sessions through the `nsupdate` client.

use super::UpdateSubmitter;
use crate::errors::UpdateError;
use crate::transaction::UpdateTransaction;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Prefix nsupdate prints when the server answers with an error rcode
const UPDATE_FAILED_PREFIX: &str = "update failed: ";

/// Runs `nsupdate -k <key>` once per transaction and writes the session to stdin.
#[derive(Debug, Clone)]
pub struct NsupdateSubmitter {
    binary: String,
    key_path: PathBuf,
}

impl NsupdateSubmitter {
    /// Use `binary` authenticated with the key file at `key_path`.
    #[must_use]
    pub fn new(binary: &str, key_path: &Path) -> Self {
        Self {
            binary: binary.to_string(),
            key_path: key_path.to_path_buf(),
        }
    }
}

#[async_trait]
impl UpdateSubmitter for NsupdateSubmitter {
    async fn submit(&self, transaction: &UpdateTransaction) -> Result<(), UpdateError> {
        let script = transaction.to_nsupdate_script();
        let session_failed = |reason: String| UpdateError::SessionFailed {
            zone: transaction.zone().to_string(),
            server: transaction.server().to_string(),
            reason,
        };

        debug!("Running {} -k {}", self.binary, self.key_path.display());
        let mut child = Command::new(&self.binary)
            .arg("-k")
            .arg(&self.key_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| session_failed(format!("failed to start {}: {e}", self.binary)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| session_failed("stdin was not captured".to_string()))?;
        stdin
            .write_all(script.as_bytes())
            .await
            .map_err(|e| session_failed(format!("failed to write session: {e}")))?;
        // Closing stdin ends the session
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| session_failed(format!("failed to wait for {}: {e}", self.binary)))?;

        if output.status.success() {
            info!(
                zone = %transaction.zone(),
                digest = %transaction.digest(),
                "Submitted {} update operations via nsupdate",
                transaction.operations().len()
            );
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!(
            "nsupdate exited with {} for zone {}: {}",
            output.status,
            transaction.zone(),
            stderr
        );

        if let Some(code) = stderr
            .lines()
            .find_map(|line| line.trim().strip_prefix(UPDATE_FAILED_PREFIX))
        {
            return Err(UpdateError::Rejected {
                zone: transaction.zone().to_string(),
                server: transaction.server().to_string(),
                code: code.trim().to_string(),
            });
        }

        Err(session_failed(format!("{}: {stderr}", output.status)))
    }

    fn channel(&self) -> &'static str {
        "nsupdate"
    }
}
