use std::cmp::Ordering;

use anyhow::{anyhow, Result};
use rand::Rng;

/// Peer selection derived from one vector of average round-trip times, indexed by peer.
#[derive(Clone, Debug)]
pub struct ServerRanker {
    rtt: Vec<f64>,
}

impl ServerRanker {
    pub fn new(rtt: Vec<f64>) -> Result<Self> {
        if rtt.is_empty() {
            return Err(anyhow!("cannot rank an empty peer set"));
        }

        if rtt.iter().any(|x| !x.is_finite() || *x < 0.0) {
            return Err(anyhow!("round-trip times must be finite and non-negative: {rtt:?}"));
        }

        Ok(Self { rtt })
    }

    pub fn len(&self) -> usize {
        self.rtt.len()
    }

    pub fn rtt(&self) -> &[f64] {
        &self.rtt
    }

    /// Peer with the smallest RTT, lowest index on ties.
    pub fn local_server(&self) -> usize {
        let mut local = 0;
        for n in 1..self.rtt.len() {
            if self.rtt[n] < self.rtt[local] {
                local = n;
            }
        }
        local
    }

    /// Smallest RTT among peers other than `exclude`, lowest index on ties.
    pub fn closest_server(&self, exclude: usize) -> Option<usize> {
        self.extreme_excluding(exclude, Ordering::Less)
    }

    /// Largest RTT among peers other than `exclude`, lowest index on ties.
    pub fn farthest_server(&self, exclude: usize) -> Option<usize> {
        self.extreme_excluding(exclude, Ordering::Greater)
    }

    /// For each peer, the number of peers with a strictly smaller RTT.
    ///
    /// Tied peers share a rank, so this is not a permutation. Use [`Self::ascending_order`]
    /// to visit peers.
    pub fn ranks(&self) -> Vec<usize> {
        self.rtt
            .iter()
            .map(|x| self.rtt.iter().filter(|y| *y < x).count())
            .collect()
    }

    /// Peer indices from fastest to slowest, ties broken by lower index.
    pub fn ascending_order(&self) -> Vec<usize> {
        let mut order: Vec<_> = (0..self.rtt.len()).collect();
        // sort_by is stable, equal RTTs keep index order
        order.sort_by(|a, b| self.rtt[*a].total_cmp(&self.rtt[*b]));
        order
    }

    fn extreme_excluding(&self, exclude: usize, wanted: Ordering) -> Option<usize> {
        let mut best: Option<usize> = None;

        for n in (0..self.rtt.len()).filter(|n| *n != exclude) {
            best = match best {
                Some(b) if self.rtt[n].total_cmp(&self.rtt[b]) != wanted => Some(b),
                _ => Some(n),
            };
        }

        best
    }
}

/// Uniform index in `0..n`, never equal to `exclude`. `None` when nothing is left to pick.
pub fn random_peer<R: Rng + ?Sized>(rng: &mut R, n: usize, exclude: Option<usize>) -> Option<usize> {
    match exclude {
        Some(exclude) if exclude < n => {
            if n < 2 {
                return None;
            }
            // draw from the n - 1 remaining slots and shift past the excluded one
            let pick = rng.gen_range(0..n - 1);
            Some(if pick >= exclude { pick + 1 } else { pick })
        },
        _ => {
            if n == 0 {
                return None;
            }
            Some(rng.gen_range(0..n))
        },
    }
}
