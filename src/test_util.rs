//! In-process peers for orchestrator tests.

use std::{
    net::{SocketAddr, TcpListener},
    num::NonZeroUsize,
    path::Path,
};

use tokio::sync::mpsc::unbounded_channel;

use crate::{
    block::Digest,
    config::{DownloadSettings, UploadSettings},
    peer::Peer,
    placement::Policy,
    server::bind_server,
    store::PeerStore,
    system::System,
};

const TEST_TIMEOUT: u64 = 2000; // in ms
const TEST_PING_COUNT: usize = 2;

pub struct TestCluster {
    pub system: System,
}

impl TestCluster {
    pub async fn start(n: usize) -> Self {
        let mut addrs = vec![];
        for _ in 0..n {
            addrs.push(spawn_peer().await);
        }
        Self::from_addrs(addrs)
    }

    /// `n` live peers followed by one address nobody listens on.
    pub async fn start_with_dead_peer(n: usize) -> Self {
        let mut addrs = vec![];
        for _ in 0..n {
            addrs.push(spawn_peer().await);
        }
        addrs.push(unused_addr());
        Self::from_addrs(addrs)
    }

    fn from_addrs(addrs: Vec<SocketAddr>) -> Self {
        let peers = addrs
            .into_iter()
            .enumerate()
            .map(|(index, addr)| Peer::new(index, &addr.to_string()).unwrap())
            .collect();

        Self {
            system: System::new(peers, TEST_TIMEOUT, TEST_PING_COUNT, 0).unwrap(),
        }
    }

    /// Stored digests of every peer, by peer index.
    pub async fn stored_blocks(&self) -> Vec<Vec<Digest>> {
        let mut stored = vec![];
        for peer in &self.system.peers {
            stored.push(peer.send_get_stored_blocks(&self.system).await.unwrap());
        }
        stored
    }
}

async fn spawn_peer() -> SocketAddr {
    let (tx, rx) = unbounded_channel();
    tokio::spawn(PeerStore::start(rx));

    let (addr, server) = bind_server("127.0.0.1:0".parse().unwrap(), tx).unwrap();
    tokio::spawn(server);
    addr
}

fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub fn upload_settings(base_dir: &Path, block_size: usize, policy: Policy) -> UploadSettings {
    UploadSettings {
        base_dir: base_dir.to_path_buf(),
        block_size: NonZeroUsize::new(block_size).unwrap(),
        policy,
    }
}

pub fn download_settings(base_dir: &Path, block_size: usize) -> DownloadSettings {
    DownloadSettings {
        base_dir: base_dir.to_path_buf(),
        block_size: NonZeroUsize::new(block_size).unwrap(),
    }
}
