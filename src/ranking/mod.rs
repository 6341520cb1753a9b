mod prober;
mod ranker;

pub use prober::{check_liveness, probe};
pub use ranker::{random_peer, ServerRanker};

use anyhow::Result;
use log::info;

use crate::system::System;

/// Liveness check, latency probe and ranking in one step.
pub async fn rank_peers(system: &System) -> Result<ServerRanker> {
    check_liveness(system).await?;
    let rtt = probe(system).await?;
    let ranker = ServerRanker::new(rtt)?;

    for (index, (rtt, rank)) in ranker.rtt().iter().zip(ranker.ranks()).enumerate() {
        info!("Peer {index}: average RTT {rtt:.3}ms, rank {rank}. ");
    }

    Ok(ranker)
}
