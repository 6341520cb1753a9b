use std::time::Duration;

use anyhow::Result;
use log::warn;
use reqwest::{header, StatusCode};
use tokio::time::sleep;

use crate::{
    block::{Block, Digest, FileMetadata, FileMetadataMap},
    error::RpcError,
    peer::Peer,
    store::protocol::{IncomingResponse, Request},
    system::System,
    util::*,
};

const RETRY_BASE_DELAY_MS: u64 = 150;

impl Peer {
    pub async fn send_ping(&self, system: &System) -> Result<()> {
        match send_request_to_peer(&Request::Ping, self, system).await? {
            IncomingResponse::Ping => Ok(()),
            _ => Err(RpcError::UnexpectedResponse { peer: self.index }.into()),
        }
    }

    /// Fails with [`RpcError::NotFound`] when the peer does not hold `digest`.
    pub async fn send_get_block(&self, digest: &Digest, system: &System) -> Result<Block> {
        match send_request_to_peer(&Request::GetBlock(digest), self, system).await? {
            IncomingResponse::GetBlock(block) => Ok(block),
            _ => Err(RpcError::UnexpectedResponse { peer: self.index }.into()),
        }
    }

    pub async fn send_store_block(&self, digest: &Digest, block: &Block, system: &System) -> Result<()> {
        match send_request_to_peer(&Request::StoreBlock(digest, block), self, system).await? {
            IncomingResponse::StoreBlock => Ok(()),
            _ => Err(RpcError::UnexpectedResponse { peer: self.index }.into()),
        }
    }

    pub async fn send_get_file_info_map(&self, system: &System) -> Result<FileMetadataMap> {
        match send_request_to_peer(&Request::GetFileInfoMap, self, system).await? {
            IncomingResponse::GetFileInfoMap(files) => Ok(files),
            _ => Err(RpcError::UnexpectedResponse { peer: self.index }.into()),
        }
    }

    pub async fn send_record_file(&self, name: &str, metadata: &FileMetadata, system: &System) -> Result<()> {
        match send_request_to_peer(&Request::RecordFile(name, metadata), self, system).await? {
            IncomingResponse::RecordFile => Ok(()),
            _ => Err(RpcError::UnexpectedResponse { peer: self.index }.into()),
        }
    }

    pub async fn send_get_stored_blocks(&self, system: &System) -> Result<Vec<Digest>> {
        match send_request_to_peer(&Request::GetStoredBlocks, self, system).await? {
            IncomingResponse::GetStoredBlocks(digests) => Ok(digests),
            _ => Err(RpcError::UnexpectedResponse { peer: self.index }.into()),
        }
    }
}

/// Sends one request, repeating transport failures up to `system.retries` times.
async fn send_request_to_peer(
    req: &Request<'_>,
    peer: &Peer,
    system: &System,
) -> Result<IncomingResponse, RpcError> {
    let mut attempt = 0;

    loop {
        let err = match send_request_to_addr(req, peer, system).await {
            Ok(resp) => return Ok(resp),
            Err(e) => e,
        };

        if !err.is_retryable() || attempt >= system.retries {
            return Err(err);
        }

        let delay = RETRY_BASE_DELAY_MS << attempt.min(6);
        warn!("{} to peer {peer} failed: {err}. Retrying in {delay}ms. ", req.method());
        sleep(Duration::from_millis(delay)).await;
        attempt += 1;
    }
}

async fn send_request_to_addr(
    req: &Request<'_>,
    peer: &Peer,
    system: &System,
) -> Result<IncomingResponse, RpcError> {
    let transport = |e: reqwest::Error| {
        if e.is_timeout() {
            RpcError::Timeout { peer: peer.index }
        } else if e.is_decode() {
            RpcError::UnexpectedResponse { peer: peer.index }
        } else {
            RpcError::Transport {
                peer: peer.index,
                reason: e.to_string(),
            }
        }
    };

    let response = system.client
        .post(rpc_uri(peer))
        .json(&req)
        .header(header::CONTENT_TYPE, "application/json")
        .send()
        .await
        .map_err(transport)?;

    match response.status() {
        StatusCode::OK => {},
        StatusCode::NOT_FOUND => {
            let digest = response.text().await.map_err(transport)?;
            return Err(RpcError::NotFound {
                peer: peer.index,
                digest,
            });
        },
        status => {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(RpcError::Remote {
                peer: peer.index,
                message,
            });
        },
    }

    response.json().await.map_err(transport)
}
