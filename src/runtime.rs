// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Container runtime inspection.
//!
//! The reconciler asks the runtime for a container's current hostname, name and
//! IP address at the moment a start event is handled. Nothing is cached: a
//! container that vanished in the meantime yields [`RuntimeError::NotFound`].

use crate::constants::SHORT_ID_LEN;
use crate::errors::RuntimeError;
use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::models::ContainerInspectResponse;
use bollard::Docker;
use serde::Serialize;
use tracing::debug;

/// What the DNS records of one container are derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerIdentity {
    /// Full 64-character identifier
    pub id: String,
    /// First 12 characters of `id`
    pub short_id: String,
    /// `Config.Hostname`
    pub hostname: String,
    /// Container name without the leading `/`
    pub name: String,
    /// IPv4 address on the container's network
    pub ip: String,
}

impl ContainerIdentity {
    /// Build an identity, deriving the short id from `id`.
    #[must_use]
    pub fn new(id: &str, hostname: &str, name: &str, ip: &str) -> Self {
        Self {
            id: id.to_string(),
            short_id: id.chars().take(SHORT_ID_LEN).collect(),
            hostname: hostname.to_string(),
            name: name.trim_start_matches('/').to_string(),
            ip: ip.to_string(),
        }
    }
}

/// Read access to the container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Look up the current identity of a container.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotFound`] if the container no longer exists,
    /// [`RuntimeError::Incomplete`] if it has no hostname, name or IP address,
    /// and [`RuntimeError::Unavailable`] for any other runtime failure.
    async fn inspect(&self, container_id: &str) -> Result<ContainerIdentity, RuntimeError>;

    /// Identifiers of all running containers, in the order the runtime reports them.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Unavailable`] if the runtime cannot be queried.
    async fn list_running(&self) -> Result<Vec<String>, RuntimeError>;
}

/// [`ContainerRuntime`] backed by the Docker Engine API.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using the local defaults (`DOCKER_HOST` or the local socket).
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be configured.
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults().map_err(|e| {
            RuntimeError::Unavailable {
                reason: e.to_string(),
            }
        })?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn inspect(&self, container_id: &str) -> Result<ContainerIdentity, RuntimeError> {
        match self
            .docker
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await
        {
            Ok(details) => identity_from_inspect(container_id, &details),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(RuntimeError::NotFound {
                container_id: container_id.to_string(),
            }),
            Err(e) => Err(RuntimeError::Unavailable {
                reason: e.to_string(),
            }),
        }
    }

    async fn list_running(&self) -> Result<Vec<String>, RuntimeError> {
        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| RuntimeError::Unavailable {
                reason: e.to_string(),
            })?;

        let ids: Vec<String> = containers.into_iter().filter_map(|c| c.id).collect();
        debug!("Runtime reports {} running containers", ids.len());
        Ok(ids)
    }
}

/// Extract a [`ContainerIdentity`] from an inspect response.
///
/// The IP address comes from `NetworkSettings.IPAddress`; containers attached
/// only to user-defined networks leave it empty, in which case the first
/// non-empty per-network address (by network name) is used.
///
/// # Errors
///
/// Returns [`RuntimeError::Incomplete`] if the hostname, name or IP is missing.
pub fn identity_from_inspect(
    container_id: &str,
    details: &ContainerInspectResponse,
) -> Result<ContainerIdentity, RuntimeError> {
    let incomplete = |field: &'static str| RuntimeError::Incomplete {
        container_id: container_id.to_string(),
        field,
    };

    let id = details
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .unwrap_or(container_id);

    let hostname = details
        .config
        .as_ref()
        .and_then(|config| config.hostname.as_deref())
        .filter(|hostname| !hostname.is_empty())
        .ok_or_else(|| incomplete("hostname"))?;

    let name = details
        .name
        .as_deref()
        .map(|name| name.trim_start_matches('/'))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| incomplete("name"))?;

    let ip = details
        .network_settings
        .as_ref()
        .and_then(|settings| {
            settings
                .ip_address
                .clone()
                .filter(|ip| !ip.is_empty())
                .or_else(|| {
                    let networks = settings.networks.as_ref()?;
                    let mut names: Vec<&String> = networks.keys().collect();
                    names.sort();
                    names.into_iter().find_map(|network| {
                        networks[network]
                            .ip_address
                            .clone()
                            .filter(|ip| !ip.is_empty())
                    })
                })
        })
        .ok_or_else(|| incomplete("IP address"))?;

    Ok(ContainerIdentity::new(id, hostname, name, &ip))
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod runtime_tests;
