use std::{
    fmt::{Display, Formatter},
    result,
    str::FromStr,
};

use log::info;
use rand::Rng;

use crate::{
    error::ConfigError,
    ranking::{random_peer, ServerRanker},
};

/// Which peers receive each uploaded block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Policy {
    /// One uniformly random peer per block.
    Random,
    /// Two distinct uniformly random peers per block.
    TwoRandom,
    /// The lowest-RTT peer only.
    Local,
    /// The lowest-RTT peer and the next-lowest.
    LocalClosest,
    /// The lowest-RTT peer and the highest-RTT one.
    LocalFarthest,
}

impl Policy {
    pub const ALL: [Policy; 5] = [
        Policy::Random,
        Policy::TwoRandom,
        Policy::Local,
        Policy::LocalClosest,
        Policy::LocalFarthest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Policy::Random => "random",
            Policy::TwoRandom => "tworandom",
            Policy::Local => "local",
            Policy::LocalClosest => "localclosest",
            Policy::LocalFarthest => "localfarthest",
        }
    }

    /// Copies each block is stored with.
    pub fn replicas(&self) -> usize {
        match self {
            Policy::Random | Policy::Local => 1,
            Policy::TwoRandom | Policy::LocalClosest | Policy::LocalFarthest => 2,
        }
    }

    /// Smallest peer set the policy can place on.
    pub fn min_peers(&self) -> usize {
        self.replicas()
    }
}

impl FromStr for Policy {
    type Err = ConfigError;

    fn from_str(s: &str) -> result::Result<Self, ConfigError> {
        Policy::ALL
            .into_iter()
            .find(|policy| policy.name() == s)
            .ok_or(ConfigError::Policy(s.to_string()))
    }
}

impl Display for Policy {
    fn fmt(&self, f: &mut Formatter) -> result::Result<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

/// A policy bound to one ranking, decided once per upload run.
#[derive(Clone, Debug)]
pub struct Placement {
    policy: Policy,
    peer_count: usize,
    local: usize,
    closest: Option<usize>,
    farthest: Option<usize>,
}

impl Placement {
    pub fn new(policy: Policy, ranker: &ServerRanker) -> result::Result<Self, ConfigError> {
        let peer_count = ranker.len();
        if peer_count < policy.min_peers() {
            return Err(ConfigError::NotEnoughPeers {
                policy: policy.to_string(),
                required: policy.min_peers(),
                configured: peer_count,
            });
        }

        let local = ranker.local_server();
        let closest = ranker.closest_server(local);
        let farthest = ranker.farthest_server(local);

        info!("Local peer: {local}. ");
        if let Some(closest) = closest {
            info!("Closest peer: {closest}. ");
        }
        if let Some(farthest) = farthest {
            info!("Farthest peer: {farthest}. ");
        }

        Ok(Self {
            policy,
            peer_count,
            local,
            closest,
            farthest,
        })
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Peer indices that must store the next block. Never contains duplicates.
    pub fn targets<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let n = self.peer_count;

        // the peer count was checked against min_peers in new, so every pick below exists
        let targets = match self.policy {
            Policy::Random => vec![random_peer(rng, n, None)],
            Policy::TwoRandom => {
                let first = random_peer(rng, n, None);
                let second = first.and_then(|first| random_peer(rng, n, Some(first)));
                vec![first, second]
            },
            Policy::Local => vec![Some(self.local)],
            Policy::LocalClosest => vec![Some(self.local), self.closest],
            Policy::LocalFarthest => vec![Some(self.local), self.farthest],
        };

        targets.into_iter().flatten().collect()
    }
}
