// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::Parser;
use docker_ddns::{
    aliases::{AliasResolver, DnsMarkerSource},
    config::{Cli, Config, UpdateMethod},
    events::{open_event_file, CommandEventSource, EventSource},
    logging::init_logging,
    metrics::serve_metrics,
    reconciler::Reconciler,
    runtime::{ContainerRuntime, DockerRuntime},
    tsig::load_key_file,
    update::{DryRunSubmitter, NsupdateSubmitter, Rfc2136Submitter, UpdateSubmitter},
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let config = Config::from_cli(Cli::parse())?;

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("docker-ddns")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<()> {
    init_logging(
        &config.log_level,
        config.log_format,
        config.log_file.as_deref(),
    )?;

    info!("Starting docker-ddns");
    debug!(?config, "Configuration loaded");

    let submitter = build_submitter(&config).await?;
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerRuntime::connect()?);
    let aliases = AliasResolver::new(Arc::new(DnsMarkerSource::new(
        &config.server,
        config.port,
    )));
    let reconciler = Reconciler::new(
        &config.domain,
        &config.zone,
        &config.server,
        config.port,
        runtime,
        aliases,
        submitter,
    );

    if let Some(addr) = config.metrics_bind_address {
        tokio::spawn(async move {
            if let Err(e) = serve_metrics(addr).await {
                error!("Metrics server exited: {:#}", e);
            }
        });
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(forward_shutdown(shutdown_tx));

    // Open the stream before catching up so no event is lost in between
    let mut source: Box<dyn EventSource> = match &config.events_file {
        Some(path) => open_event_file(path).await?,
        None => Box::new(CommandEventSource::docker(&config.docker_bin)?),
    };

    if config.catchup {
        match reconciler.catch_up().await {
            Ok(count) => info!("Catch-up visited {} running containers", count),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => error!("Catch-up failed: {}", e),
        }
    }

    reconciler.run(source.as_mut(), shutdown_rx).await?;

    info!("docker-ddns stopped");
    Ok(())
}

/// Pick the update channel from the configuration.
async fn build_submitter(config: &Config) -> Result<Arc<dyn UpdateSubmitter>> {
    if config.dry_run {
        info!("Dry run enabled, updates will only be logged");
        return Ok(Arc::new(DryRunSubmitter));
    }

    let key_path = config
        .key_path
        .as_deref()
        .context("--key is required unless --dry-run is set")?;

    match config.update_method {
        UpdateMethod::Nsupdate => {
            tokio::fs::metadata(key_path)
                .await
                .with_context(|| format!("Cannot access key file {}", key_path.display()))?;
            Ok(Arc::new(NsupdateSubmitter::new(
                &config.nsupdate_bin,
                key_path,
            )))
        }
        UpdateMethod::Rfc2136 => {
            let key_data = load_key_file(key_path).await?;
            info!(
                key = %key_data.name,
                algorithm = key_data.algorithm.as_str(),
                "Loaded TSIG key"
            );
            Ok(Arc::new(Rfc2136Submitter::new(key_data)))
        }
    }
}

/// Flip `shutdown` once SIGINT or SIGTERM arrives.
async fn forward_shutdown(shutdown: watch::Sender<bool>) {
    match shutdown_signal().await {
        Ok(signal) => info!("Received {}, finishing current event and shutting down", signal),
        Err(e) => {
            warn!("Failed to install signal handlers: {:#}", e);
            return;
        }
    }
    if shutdown.send(true).is_err() {
        debug!("Event loop already stopped");
    }
}

/// Wait for SIGINT (Ctrl+C) or, on Unix, SIGTERM.
async fn shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                Ok("SIGINT")
            }
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("SIGINT")
    }
}
