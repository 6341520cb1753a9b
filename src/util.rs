use std::{
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

use anyhow::{anyhow, Result};

use crate::peer::Peer;

/// Resolves a `host:port` endpoint. The port must be in 1..=65535.
pub fn string_to_socket(s: &str) -> Result<SocketAddr> {
    let (host, port) = s.rsplit_once(':').ok_or(anyhow!("missing port"))?;

    if host.is_empty() {
        return Err(anyhow!("missing host"));
    }

    let port: u16 = port.parse().map_err(|_| anyhow!("invalid port {port}"))?;
    if port == 0 {
        return Err(anyhow!("invalid port {port}"));
    }

    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let addr = s.to_socket_addrs()?.next().ok_or(anyhow!("cannot resolve hostname {host}"))?;

    Ok(addr)
}

pub fn rpc_uri(peer: &Peer) -> String {
    format!("http://{}/rpc", peer.addr)
}

/// Milliseconds with sub-millisecond precision.
pub fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
