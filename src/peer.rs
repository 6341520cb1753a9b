use std::{
    fmt::{Display, Formatter},
    net::SocketAddr,
    result,
};

use crate::{error::ConfigError, util::*};

/// One member of the fixed peer set, addressed by its position in the configuration.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Peer {
    pub index: usize,
    pub endpoint: String,
    pub addr: SocketAddr,
}

impl Peer {
    pub fn new(index: usize, endpoint: &str) -> result::Result<Self, ConfigError> {
        let addr = string_to_socket(endpoint).map_err(|e| ConfigError::Endpoint {
            index,
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            index,
            endpoint: endpoint.to_string(),
            addr,
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Display for Peer {
    fn fmt(&self, f: &mut Formatter) -> result::Result<(), std::fmt::Error> {
        write!(f, "{} ({})", self.index, self.endpoint)
    }
}

/// Builds the index-addressed peer set from `host:port` strings.
pub fn peer_set(endpoints: &[String]) -> result::Result<Vec<Peer>, ConfigError> {
    if endpoints.is_empty() {
        return Err(ConfigError::NoPeers);
    }

    endpoints
        .iter()
        .enumerate()
        .map(|(index, endpoint)| Peer::new(index, endpoint))
        .collect()
}
