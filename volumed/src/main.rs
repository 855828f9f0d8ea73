//! `volumed`: Docker volume plugin daemon for Quobyte.
//!
//! Startup: validate configuration, make sure the Quobyte namespace is
//! mounted at the mount root, bind the plugin socket, then serve lifecycle
//! requests until SIGINT/SIGTERM.

mod config;

use std::os::unix::fs::DirBuilderExt;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use libvolume::{QuobyteClient, QuobyteDriver, mount, plugin};
use nix::unistd::{Gid, Group};
use tokio::signal;
use tracing::{info, warn};

use crate::config::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_json)?;
    run(args).await
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the default
/// `info` level.
fn init_logging(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    args.validate()?;
    info!(version = env!("CARGO_PKG_VERSION"), "volumed starting");

    let client = QuobyteClient::new(&args.api, &args.user, &args.password, args.api_timeout())
        .context("Failed to create API client")?;
    info!(api = %client.url(), "using Quobyte API server");

    prepare_namespace(&args).await?;

    let gid = lookup_group(&args.group)?;
    let driver = Arc::new(QuobyteDriver::new(client, args.driver_config()));

    let listener = plugin::bind_socket(&args.socket)
        .with_context(|| format!("Failed to bind {}", args.socket.display()))?;
    nix::unistd::chown(&args.socket, None, Some(gid))
        .with_context(|| format!("Failed to chown {} to {}", args.socket.display(), args.group))?;

    plugin::serve(listener, driver, shutdown_signal())
        .await
        .context("Plugin server failed")?;

    info!("volumed shutting down");
    Ok(())
}

/// Create the mount root and mount the Quobyte namespace on it unless it is
/// already there.
async fn prepare_namespace(args: &Args) -> Result<()> {
    if let Err(e) = std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o555)
        .create(&args.path)
    {
        warn!(path = %args.path.display(), error = %e, "cannot create mount root");
    }

    if args.skip_namespace_mount {
        info!("skipping namespace mount");
        return Ok(());
    }
    if mount::is_mounted(&args.path).await {
        return Ok(());
    }

    mount::mount_namespace(&args.options, &args.registry, &args.path)
        .await
        .context("Failed to mount Quobyte namespace")
}

fn lookup_group(name: &str) -> Result<Gid> {
    let group = Group::from_name(name)
        .with_context(|| format!("Failed to look up group {name}"))?
        .ok_or_else(|| anyhow!("unknown group {name}"))?;
    Ok(group.gid)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
