// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Update transaction submission.
//!
//! An [`UpdateSubmitter`] opens one update session per call and commits the
//! whole [`UpdateTransaction`] at once. Three channels are provided:
//!
//! - [`NsupdateSubmitter`] - pipes the session script into `nsupdate -k <key>`
//! - [`Rfc2136Submitter`] - sends a TSIG-signed RFC 2136 UPDATE via hickory-client
//! - [`DryRunSubmitter`] - performs no I/O and only logs the would-be session
//!
//! Callers get `Ok(())` or an opaque [`UpdateError`]; there is no partial-apply
//! visibility and no transaction identifier.

pub mod nsupdate;
pub mod rfc2136;

pub use nsupdate::NsupdateSubmitter;
pub use rfc2136::{build_update_message, Rfc2136Submitter};

use crate::errors::UpdateError;
use crate::transaction::UpdateTransaction;
use async_trait::async_trait;
use tracing::info;

/// Channel that commits update transactions to the DNS server.
#[async_trait]
pub trait UpdateSubmitter: Send + Sync {
    /// Submit the transaction as one all-or-nothing session.
    ///
    /// # Errors
    ///
    /// Returns an [`UpdateError`] if the session fails or the server rejects it.
    async fn submit(&self, transaction: &UpdateTransaction) -> Result<(), UpdateError>;

    /// Short channel name for logs and metrics.
    fn channel(&self) -> &'static str;
}

/// Submitter that never talks to the DNS server.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunSubmitter;

#[async_trait]
impl UpdateSubmitter for DryRunSubmitter {
    async fn submit(&self, transaction: &UpdateTransaction) -> Result<(), UpdateError> {
        info!(
            zone = %transaction.zone(),
            digest = %transaction.digest(),
            "Dry run, not submitting update:\n{}",
            transaction.to_nsupdate_script()
        );
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "dry-run"
    }
}
