use std::time::Duration;

use anyhow::Result;
use reqwest::Client;

use crate::{config::Config, peer::Peer};

/// Everything an orchestrator run needs to talk to the peer set.
pub struct System {
    pub peers: Vec<Peer>,
    pub client: Client,
    pub ping_count: usize,
    pub retries: u32,
}

impl System {
    pub fn new(peers: Vec<Peer>, timeout: u64, ping_count: usize, retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout))
            .build()?;

        Ok(Self {
            peers,
            client,
            ping_count,
            retries,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.peers()?, config.timeout, config.ping_count, config.retries)
    }

    pub fn peer(&self, index: usize) -> &Peer {
        &self.peers[index]
    }
}
