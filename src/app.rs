use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{anyhow, Result};
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::mpsc::unbounded_channel;

use crate::{
    config::{Config, DownloadSettings, UploadSettings},
    error::ConfigError,
    server::start_server,
    store::PeerStore,
    system::System,
    transfer::{download, upload},
};

const IPV4_WILDCARD: IpAddr = IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0));

/// What this process was started as.
pub enum Role {
    Serve { index: usize },
    Upload,
    Download,
}

enum Task {
    Serve { listen: SocketAddr },
    Upload(UploadSettings),
    Download(DownloadSettings),
}

pub struct App {
    system: System,
    task: Task,
}

impl App {
    /// Validates everything the role needs before any network traffic.
    pub fn new(config: Config, role: Role) -> Result<Self> {
        let system = System::from_config(&config)?;

        let task = match role {
            Role::Serve { index } => {
                let peer = system.peers.get(index).ok_or(ConfigError::PeerIndex {
                    index,
                    configured: system.peers.len(),
                })?;
                info!("Serving as peer {peer}. ");

                Task::Serve {
                    listen: SocketAddr::new(IPV4_WILDCARD, peer.port()),
                }
            },
            Role::Upload => Task::Upload(config.upload_settings()?),
            Role::Download => Task::Download(config.download_settings()?),
        };

        Ok(Self { system, task })
    }

    pub async fn start(self) -> Result<()> {
        match self.task {
            Task::Serve { listen } => {
                let (store_tx, store_rx) = unbounded_channel();
                let store = tokio::spawn(PeerStore::start(store_rx));
                let server = tokio::spawn(start_server(listen, store_tx));

                tokio::select! {
                    result = store => result.map_err(|e| anyhow!("peer store panicked: {e}"))??,
                    result = server => result.map_err(|e| anyhow!("server panicked: {e}"))??,
                }

                Err(anyhow!("peer exited unexpectedly"))
            },
            Task::Upload(settings) => {
                let mut rng = StdRng::from_entropy();
                let report = upload(&settings, &self.system, &mut rng).await?;
                info!("Upload finished: {report:?}. ");
                Ok(())
            },
            Task::Download(settings) => {
                let report = download(&settings, &self.system).await?.into_result()?;
                info!("Download finished: {report:?}. ");
                Ok(())
            },
        }
    }
}
