use thiserror::Error;

use crate::block::Digest;

/// Exit status for configuration errors, as in `sysexits.h`.
pub const EX_CONFIG: i32 = 78;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base directory: {0:?}")]
    BaseDirectory(String),

    #[error("invalid block size: {0}")]
    BlockSize(i64),

    #[error("invalid placement policy: {0:?}")]
    Policy(String),

    #[error("policy {policy} needs at least {required} peers, {configured} configured")]
    NotEnoughPeers {
        policy: String,
        required: usize,
        configured: usize,
    },

    #[error("no peers configured")]
    NoPeers,

    #[error("invalid endpoint for peer {index}: {endpoint:?} ({reason})")]
    Endpoint {
        index: usize,
        endpoint: String,
        reason: String,
    },

    #[error("peer index {index} out of range, {configured} peers configured")]
    PeerIndex {
        index: usize,
        configured: usize,
    },

    #[error("invalid ping count: {0}")]
    PingCount(usize),

    #[error("missing [{0}] section")]
    MissingSection(&'static str),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("peer {peer} unreachable: {reason}")]
    Transport { peer: usize, reason: String },

    #[error("peer {peer} timed out")]
    Timeout { peer: usize },

    #[error("peer {peer} does not hold block {digest}")]
    NotFound { peer: usize, digest: String },

    #[error("peer {peer} failed to process request: {message}")]
    Remote { peer: usize, message: String },

    #[error("peer {peer} returned an unexpected response")]
    UnexpectedResponse { peer: usize },
}

impl RpcError {
    /// Only connection failures and timeouts are worth repeating.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DownloadError {
    #[error("block {digest} of {file} unavailable, checked peers {peers_checked:?}")]
    BlockUnavailable {
        file: String,
        digest: Digest,
        peers_checked: Vec<usize>,
    },

    #[error("refusing to write file with unsafe name {0:?}")]
    UnsafeFileName(String),
}
