//! Keep-alive HTTP endpoint. Hosting platforms that idle out processes
//! without inbound traffic ping this; it touches no bot state.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tracing::info;

pub async fn serve(port: u16) -> Result<()> {
    let app = Router::new().route("/", get(|| async { "I'm alive!" }));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind keep-alive endpoint on {addr}"))?;

    info!("Keep-alive endpoint listening on {}", addr);
    axum::serve(listener, app)
        .await
        .context("Keep-alive server error")?;
    Ok(())
}
