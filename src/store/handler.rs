use anyhow::{anyhow, Result};
use axum::{
    extract::{Extension, Json},
    http::{header, StatusCode},
    response::IntoResponse,
};
use log::{debug, info};
use tokio::sync::{mpsc::UnboundedSender, oneshot};

use crate::{
    block::{Block, Digest, FileMetadata},
    store::{
        protocol::{IncomingRequest, Response},
        storage::Command,
    },
};

enum Outcome {
    Found(String),
    NotFound(Digest),
}

pub async fn rpc_handler(
    Extension(store_tx): Extension<UnboundedSender<Command>>,
    Json(request): Json<IncomingRequest>,
) -> impl IntoResponse {
    let response = match rpc_handler_impl(request, store_tx).await {
        Ok(Outcome::Found(response)) => response,
        Ok(Outcome::NotFound(digest)) => {
            return (StatusCode::NOT_FOUND, digest.to_string()).into_response();
        },
        Err(e) => {
            let message = format!("Failed to process request: {e}. ");
            return (StatusCode::INTERNAL_SERVER_ERROR, message).into_response();
        },
    };

    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], response).into_response()
}

async fn rpc_handler_impl(
    request: IncomingRequest,
    store_tx: UnboundedSender<Command>,
) -> Result<Outcome> {
    match request {
        IncomingRequest::Ping => ping_impl(),
        IncomingRequest::GetBlock(digest) => get_block_impl(digest, store_tx).await,
        IncomingRequest::StoreBlock(digest, block) => store_block_impl(digest, block, store_tx).await,
        IncomingRequest::GetFileInfoMap => get_file_info_map_impl(store_tx).await,
        IncomingRequest::RecordFile(name, metadata) => record_file_impl(name, metadata, store_tx).await,
        IncomingRequest::GetStoredBlocks => get_stored_blocks_impl(store_tx).await,
    }
}

fn ping_impl() -> Result<Outcome> {
    debug!("ping() ");
    let response = serde_json::to_string(&Response::Ping)?;
    Ok(Outcome::Found(response))
}

async fn get_block_impl(digest: Digest, store_tx: UnboundedSender<Command>) -> Result<Outcome> {
    debug!("get_block({}) ", digest.short());

    let (tx, rx) = oneshot::channel();
    store_tx
        .send(Command::GetBlock(digest.clone(), tx))
        .map_err(|_| anyhow!("peer store is gone"))?;

    let block = match rx.await? {
        Some(block) => block,
        None => {
            debug!("No matching block for {}. ", digest.short());
            return Ok(Outcome::NotFound(digest));
        },
    };

    let response = serde_json::to_string(&Response::GetBlock(&block))?;
    Ok(Outcome::Found(response))
}

async fn store_block_impl(
    digest: Digest,
    block: Block,
    store_tx: UnboundedSender<Command>,
) -> Result<Outcome> {
    debug!("store_block({}, {} bytes) ", digest.short(), block.len());

    let (tx, rx) = oneshot::channel();
    store_tx
        .send(Command::StoreBlock(digest, block, tx))
        .map_err(|_| anyhow!("peer store is gone"))?;
    rx.await?;

    let response = serde_json::to_string(&Response::StoreBlock)?;
    Ok(Outcome::Found(response))
}

async fn get_file_info_map_impl(store_tx: UnboundedSender<Command>) -> Result<Outcome> {
    debug!("get_file_info_map() ");

    let (tx, rx) = oneshot::channel();
    store_tx
        .send(Command::GetFileInfoMap(tx))
        .map_err(|_| anyhow!("peer store is gone"))?;
    let files = rx.await?;

    let response = serde_json::to_string(&Response::GetFileInfoMap(&files))?;
    Ok(Outcome::Found(response))
}

async fn record_file_impl(
    name: String,
    metadata: FileMetadata,
    store_tx: UnboundedSender<Command>,
) -> Result<Outcome> {
    debug!("record_file({name}, {} block(s)) ", metadata.block_count());

    let (tx, rx) = oneshot::channel();
    store_tx
        .send(Command::RecordFile(name.clone(), metadata, tx))
        .map_err(|_| anyhow!("peer store is gone"))?;

    if rx.await? {
        info!("File {name} created. ");
    } else {
        info!("File {name} updated. ");
    }

    let response = serde_json::to_string(&Response::RecordFile)?;
    Ok(Outcome::Found(response))
}

async fn get_stored_blocks_impl(store_tx: UnboundedSender<Command>) -> Result<Outcome> {
    debug!("get_stored_blocks() ");

    let (tx, rx) = oneshot::channel();
    store_tx
        .send(Command::GetStoredBlocks(tx))
        .map_err(|_| anyhow!("peer store is gone"))?;
    let digests = rx.await?;

    let response = serde_json::to_string(&Response::GetStoredBlocks(&digests))?;
    Ok(Outcome::Found(response))
}
