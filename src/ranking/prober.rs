use std::time::Instant;

use anyhow::Result;
use log::{debug, info};

use crate::{system::System, util::*};

/// Pings every peer once. Any failure aborts the run.
pub async fn check_liveness(system: &System) -> Result<()> {
    for peer in &system.peers {
        info!("Pinging peer {peer}. ");
        peer.send_ping(system).await?;
        debug!("Peer {} is alive. ", peer.index);
    }

    Ok(())
}

/// Average round-trip time in ms per peer, over `system.ping_count` sequential pings.
pub async fn probe(system: &System) -> Result<Vec<f64>> {
    info!("Calculating average RTTs. ");

    let ping_count = system.ping_count;
    let mut avg_rtt = Vec::with_capacity(system.peers.len());

    for peer in &system.peers {
        let mut total = 0.0;

        for i in 0..ping_count {
            let start = Instant::now();
            peer.send_ping(system).await?;
            let elapsed = as_millis_f64(start.elapsed());

            debug!("Ping {} to peer {}: {elapsed:.3}ms. ", i + 1, peer.index);
            total += elapsed;
        }

        let avg = total / ping_count as f64;
        info!("Peer {} avg RTT: {avg:.3}ms. ", peer.index);
        avg_rtt.push(avg);
    }

    Ok(avg_rtt)
}
