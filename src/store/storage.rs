use std::collections::HashMap;

use anyhow::{anyhow, Result};
use log::debug;
use tokio::sync::{mpsc::UnboundedReceiver, oneshot::Sender};

use crate::block::{Block, Digest, FileMetadata, FileMetadataMap};

/// Owner of one peer's block map and file metadata map.
///
/// All access goes through [`Command`]s processed one at a time, so handlers
/// running concurrently never race on the maps.
pub struct PeerStore;

pub enum Command {
    GetBlock(Digest, Sender<Option<Block>>),
    StoreBlock(Digest, Block, Sender<bool>), // replies true if the digest was new
    GetFileInfoMap(Sender<FileMetadataMap>),
    RecordFile(String, FileMetadata, Sender<bool>), // replies true if the file was new
    GetStoredBlocks(Sender<Vec<Digest>>),
}

impl PeerStore {
    pub async fn start(mut rx: UnboundedReceiver<Command>) -> Result<()> {
        let mut blocks = HashMap::new();
        let mut files = FileMetadataMap::new();

        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::GetBlock(digest, tx) => get_block_impl(&blocks, digest, tx)?,
                Command::StoreBlock(digest, block, tx) => store_block_impl(&mut blocks, digest, block, tx)?,
                Command::GetFileInfoMap(tx) => get_file_info_map_impl(&files, tx)?,
                Command::RecordFile(name, metadata, tx) => record_file_impl(&mut files, name, metadata, tx)?,
                Command::GetStoredBlocks(tx) => get_stored_blocks_impl(&blocks, tx)?,
            }
        }

        Ok(())
    }
}

fn get_block_impl(
    storage: &HashMap<Digest, Block>,
    digest: Digest,
    tx: Sender<Option<Block>>,
) -> Result<()> {
    let block = storage.get(&digest).cloned();
    tx.send(block).map_err(|_| anyhow!("failed to send response"))?;
    Ok(())
}

fn store_block_impl(
    storage: &mut HashMap<Digest, Block>,
    digest: Digest,
    block: Block,
    tx: Sender<bool>,
) -> Result<()> {
    let new = storage.insert(digest.clone(), block).is_none();
    if !new {
        debug!("Block {} already stored, overwriting. ", digest.short());
    }
    tx.send(new).map_err(|_| anyhow!("failed to send response"))?;
    Ok(())
}

fn get_file_info_map_impl(storage: &FileMetadataMap, tx: Sender<FileMetadataMap>) -> Result<()> {
    tx.send(storage.clone()).map_err(|_| anyhow!("failed to send response"))?;
    Ok(())
}

fn record_file_impl(
    storage: &mut FileMetadataMap,
    name: String,
    metadata: FileMetadata,
    tx: Sender<bool>,
) -> Result<()> {
    // last write wins, the version is not compared
    let new = storage.insert(name, metadata).is_none();
    tx.send(new).map_err(|_| anyhow!("failed to send response"))?;
    Ok(())
}

fn get_stored_blocks_impl(storage: &HashMap<Digest, Block>, tx: Sender<Vec<Digest>>) -> Result<()> {
    let mut digests: Vec<_> = storage.keys().cloned().collect();
    digests.sort();
    tx.send(digests).map_err(|_| anyhow!("failed to send response"))?;
    Ok(())
}
