use std::net::{Shutdown, TcpListener, TcpStream};

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Connects to the server side of the exchange.
pub fn connect(host: &str, port: u16) -> Result<TcpStream> {
    info!("connecting to {}:{} ...", host, port);
    let stream = TcpStream::connect((host, port))
        .with_context(|| format!("Failed to connect to {host}:{port}"))?;
    info!("connected to {}", stream.peer_addr()?);
    Ok(stream)
}

/// Listens on `port` and accepts exactly one client.
///
/// std sets `SO_REUSEADDR` on Unix listeners, so a restarted server can rebind immediately.
pub fn accept_one(port: u16) -> Result<TcpStream> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .with_context(|| format!("Failed to listen on port {port}"))?;
    info!("listening on port {}", listener.local_addr()?.port());

    let (stream, peer) = listener.accept().context("Failed to accept a client")?;
    info!("client connected from {}", peer.ip());
    Ok(stream)
}

pub fn hang_up(stream: &TcpStream) {
    if let Err(e) = stream.shutdown(Shutdown::Both) {
        debug!("shutdown after exchange: {}", e);
    }
}
