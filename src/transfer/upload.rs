use std::{num::NonZeroUsize, path::Path, time::Instant};

use anyhow::{anyhow, Result};
use bytes::Bytes;
use log::{debug, info};
use rand::Rng;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tokio::fs;

use crate::{
    block::{chunk, Block, Digest, FileMetadata},
    config::UploadSettings,
    placement::Placement,
    ranking::rank_peers,
    system::System,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub files: usize,
    pub blocks: usize,
    pub store_calls: usize,
}

/// A local file split and hashed, ready to be placed.
pub struct PreparedFile {
    pub name: String,
    pub metadata: FileMetadata,
    pub blocks: Vec<Block>,
}

pub async fn upload<R: Rng + ?Sized>(
    settings: &UploadSettings,
    system: &System,
    rng: &mut R,
) -> Result<UploadReport> {
    let ranker = rank_peers(system).await?;
    let placement = Placement::new(settings.policy, &ranker)?;

    let names = list_files(&settings.base_dir).await?;
    info!("Uploading {} file(s) from {}. ", names.len(), settings.base_dir.display());

    let start = Instant::now();
    let mut report = UploadReport::default();

    for name in names {
        let file = prepare_file(&settings.base_dir, &name, settings.block_size).await?;
        debug!("File {name} has {} block(s). ", file.blocks.len());

        // metadata goes to every peer before any block is placed
        for peer in &system.peers {
            peer.send_record_file(&file.name, &file.metadata, system).await?;
        }

        for (digest, block) in file.metadata.block_digests.iter().zip(&file.blocks) {
            for target in placement.targets(rng) {
                system.peer(target).send_store_block(digest, block, system).await?;
                debug!("Block {} stored on peer {target}. ", digest.short());
                report.store_calls += 1;
            }
        }

        report.files += 1;
        report.blocks += file.blocks.len();
    }

    info!(
        "Uploaded {} file(s), {} block(s) with policy {} in {:.3}s. ",
        report.files,
        report.blocks,
        placement.policy(),
        start.elapsed().as_secs_f64(),
    );

    Ok(report)
}

/// Regular files directly under `base_dir`, sorted by name. Names starting with `.` are skipped.
pub async fn list_files(base_dir: &Path) -> Result<Vec<String>> {
    let mut entries = fs::read_dir(base_dir)
        .await
        .map_err(|e| anyhow!("cannot read {}: {e}", base_dir.display()))?;
    let mut names = vec![];

    while let Some(entry) = entries.next_entry().await? {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(name) => {
                debug!("Skipping non UTF-8 file name {name:?}. ");
                continue;
            },
        };

        if name.starts_with('.') {
            continue;
        }

        if !entry.file_type().await?.is_file() {
            debug!("Skipping {name}, not a regular file. ");
            continue;
        }

        names.push(name);
    }

    names.sort();
    Ok(names)
}

pub async fn prepare_file(base_dir: &Path, name: &str, block_size: NonZeroUsize) -> Result<PreparedFile> {
    let data = Bytes::from(fs::read(base_dir.join(name)).await?);
    let blocks = chunk(&data, block_size);

    let block_digests: Vec<Digest> = blocks.par_iter().map(|block| block.digest()).collect();

    Ok(PreparedFile {
        name: name.to_string(),
        metadata: FileMetadata::new(block_digests),
        blocks,
    })
}
