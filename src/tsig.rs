// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TSIG key loading for authenticated dynamic updates.
//!
//! The same BIND key file is handed to `nsupdate -k` and parsed here for the
//! RFC 2136 update channel.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hickory_client::rr::rdata::tsig::TsigAlgorithm as HickoryTsigAlgorithm;
use hickory_client::rr::Name;
use hickory_proto::rr::dnssec::tsig::TSigner;
use std::path::Path;
use std::str::FromStr;

use crate::constants::TSIG_FUDGE_TIME_SECS;

/// HMAC algorithms accepted in a BIND key file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsigAlgorithm {
    /// hmac-md5
    HmacMd5,
    /// hmac-sha1
    HmacSha1,
    /// hmac-sha224
    HmacSha224,
    /// hmac-sha256
    HmacSha256,
    /// hmac-sha384
    HmacSha384,
    /// hmac-sha512
    HmacSha512,
}

impl TsigAlgorithm {
    /// BIND name of the algorithm.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HmacMd5 => "hmac-md5",
            Self::HmacSha1 => "hmac-sha1",
            Self::HmacSha224 => "hmac-sha224",
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha384 => "hmac-sha384",
            Self::HmacSha512 => "hmac-sha512",
        }
    }
}

impl FromStr for TsigAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        // BIND also accepts the legacy "hmac-md5.sig-alg.reg.int" spelling
        match s.trim_end_matches('.').to_ascii_lowercase().as_str() {
            "hmac-md5" | "hmac-md5.sig-alg.reg.int" => Ok(Self::HmacMd5),
            "hmac-sha1" => Ok(Self::HmacSha1),
            "hmac-sha224" => Ok(Self::HmacSha224),
            "hmac-sha256" => Ok(Self::HmacSha256),
            "hmac-sha384" => Ok(Self::HmacSha384),
            "hmac-sha512" => Ok(Self::HmacSha512),
            other => anyhow::bail!("Unsupported TSIG algorithm '{other}'. Supported algorithms: hmac-md5, hmac-sha1, hmac-sha224, hmac-sha256, hmac-sha384, hmac-sha512"),
        }
    }
}

/// TSIG key data for authentication.
#[derive(Clone)]
pub struct TsigKeyData {
    /// Key name as configured on the server
    pub name: String,
    /// HMAC algorithm
    pub algorithm: TsigAlgorithm,
    /// Base64-encoded secret key
    pub secret: String,
}

impl std::fmt::Debug for TsigKeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsigKeyData")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Read and parse a BIND key file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub async fn load_key_file(path: &Path) -> Result<TsigKeyData> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read TSIG key file {}", path.display()))?;

    parse_key_file(&content).with_context(|| format!("Invalid TSIG key file {}", path.display()))
}

/// Parse a BIND9 key file to extract key metadata.
///
/// Expected format (as produced by `tsig-keygen` or `ddns-confgen`):
/// ```text
/// key "key-name" {
///     algorithm hmac-sha256;
///     secret "base64secret==";
/// };
/// ```
///
/// Only the first key block is used.
///
/// # Errors
///
/// Returns an error if the file format is invalid or required fields are missing.
pub fn parse_key_file(content: &str) -> Result<TsigKeyData> {
    // Extract key name
    let name = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("key"))
        .and_then(|line| {
            line.split('"').nth(1).or_else(|| {
                // Unquoted form: key name {
                line.split_whitespace().nth(1).filter(|s| *s != "{")
            })
        })
        .context("Failed to parse key name from key file")?
        .to_string();

    // Extract algorithm
    let algorithm_str = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("algorithm"))
        .and_then(|line| {
            line.split_whitespace()
                .nth(1) // After "algorithm"
                .map(|s| s.trim_end_matches(';'))
        })
        .context("Failed to parse algorithm from key file")?;
    let algorithm = TsigAlgorithm::from_str(algorithm_str)?;

    // Extract secret
    let secret = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("secret"))
        .and_then(|line| line.split('"').nth(1))
        .context("Failed to parse secret from key file")?
        .to_string();

    BASE64
        .decode(&secret)
        .context("Key secret is not valid base64")?;

    Ok(TsigKeyData {
        name,
        algorithm,
        secret,
    })
}

/// Create a TSIG signer from key data.
///
/// # Errors
///
/// Returns an error if the key name or secret is invalid.
pub fn create_tsig_signer(key_data: &TsigKeyData) -> Result<TSigner> {
    let algorithm = match key_data.algorithm {
        TsigAlgorithm::HmacMd5 => HickoryTsigAlgorithm::HmacMd5,
        TsigAlgorithm::HmacSha1 => HickoryTsigAlgorithm::HmacSha1,
        TsigAlgorithm::HmacSha224 => HickoryTsigAlgorithm::HmacSha224,
        TsigAlgorithm::HmacSha256 => HickoryTsigAlgorithm::HmacSha256,
        TsigAlgorithm::HmacSha384 => HickoryTsigAlgorithm::HmacSha384,
        TsigAlgorithm::HmacSha512 => HickoryTsigAlgorithm::HmacSha512,
    };

    let key_bytes = BASE64
        .decode(&key_data.secret)
        .context("Failed to decode TSIG key")?;

    let signer = TSigner::new(
        key_bytes,
        algorithm,
        Name::from_str(&key_data.name).context("Invalid TSIG key name")?,
        u16::try_from(TSIG_FUDGE_TIME_SECS).unwrap_or(300),
    )
    .context("Failed to create TSIG signer")?;

    Ok(signer)
}

#[cfg(test)]
#[path = "tsig_tests.rs"]
mod tsig_tests;
