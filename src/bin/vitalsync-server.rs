// ABOUTME: Server binary for the Vitalsync wearable connection service
// ABOUTME: Loads configuration, opens the token store, and serves the HTTP routes until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Vitalsync Server Binary
//!
//! Serves the connection flow, the token broker, and the health endpoints.

use std::future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};

use vitalsync::{config::ServerConfig, logging, resources::ServerResources, routes::build_router};

#[derive(Parser)]
#[command(name = "vitalsync-server")]
#[command(about = "Vitalsync - Fitbit connection and token lifecycle service")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    let port = config.http_port;
    let resources = Arc::new(ServerResources::from_config(config).await?);
    let app = build_router(resources);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {addr}"))?;
    info!(address = %addr, "Vitalsync server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "HTTP server error");
        return Err(e.into());
    }

    info!("Vitalsync server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
