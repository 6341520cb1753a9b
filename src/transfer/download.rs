use std::{collections::HashSet, path::Path, time::Instant};

use anyhow::{anyhow, Result};
use itertools::Itertools;
use log::{debug, info, warn};
use tokio::{fs::{self, File}, io::AsyncWriteExt};

use crate::{
    block::{Block, Digest, FileMetadata},
    config::DownloadSettings,
    error::{DownloadError, RpcError},
    ranking::rank_peers,
    system::System,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub files: usize,
    pub blocks: usize,
    pub failed: Vec<DownloadError>,
}

impl DownloadReport {
    /// Turns a run with unreconstructable files into an error naming each of them.
    pub fn into_result(self) -> Result<Self> {
        if self.failed.is_empty() {
            return Ok(self);
        }

        let failures = self.failed.iter().join("; ");
        Err(anyhow!("{} file(s) could not be downloaded: {failures}", self.failed.len()))
    }
}

pub async fn download(settings: &DownloadSettings, system: &System) -> Result<DownloadReport> {
    let ranker = rank_peers(system).await?;
    let local = ranker.local_server();
    info!("Local peer: {local}. ");

    // the local peer's listing is authoritative, other peers' metadata is never read
    let files = system.peer(local).send_get_file_info_map(system).await?;

    let mut holdings = Vec::with_capacity(system.peers.len());
    for peer in &system.peers {
        debug!("Getting stored blocks from peer {}. ", peer.index);
        let digests: HashSet<_> = peer.send_get_stored_blocks(system).await?.into_iter().collect();
        holdings.push(digests);
    }

    let order = ranker.ascending_order();
    debug!("Peer order: {order:?}. ");

    fs::create_dir_all(&settings.base_dir).await?;

    info!("Downloading {} file(s) into {}. ", files.len(), settings.base_dir.display());
    let start = Instant::now();
    let mut report = DownloadReport::default();

    for (name, metadata) in &files {
        let blocks = match retrieve_file(name, metadata, &order, &holdings, settings, system).await? {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!("Skipping {name}: {e}. ");
                report.failed.push(e);
                continue;
            },
        };

        write_file(&settings.base_dir, name, &blocks).await?;
        debug!("Wrote {name} from {} block(s). ", blocks.len());

        report.files += 1;
        report.blocks += blocks.len();
    }

    info!(
        "Downloaded {} file(s), {} block(s) in {:.3}s, {} failed. ",
        report.files,
        report.blocks,
        start.elapsed().as_secs_f64(),
        report.failed.len(),
    );

    Ok(report)
}

/// Fetches every block of one file, in order.
///
/// The outer error aborts the run; the inner one only this file.
async fn retrieve_file(
    name: &str,
    metadata: &FileMetadata,
    order: &[usize],
    holdings: &[HashSet<Digest>],
    settings: &DownloadSettings,
    system: &System,
) -> Result<Result<Vec<Block>, DownloadError>> {
    if !is_safe_file_name(name) {
        return Ok(Err(DownloadError::UnsafeFileName(name.to_string())));
    }

    let mut blocks = Vec::with_capacity(metadata.block_count());

    for digest in &metadata.block_digests {
        let block = match retrieve_block(digest, order, holdings, system).await? {
            Some(block) => block,
            None => {
                return Ok(Err(DownloadError::BlockUnavailable {
                    file: name.to_string(),
                    digest: digest.clone(),
                    peers_checked: order.to_vec(),
                }));
            },
        };

        if block.len() > settings.block_size.get() {
            warn!(
                "Block {} of {name} is {} bytes, larger than the configured block size {}. ",
                digest.short(),
                block.len(),
                settings.block_size,
            );
        }

        blocks.push(block);
    }

    Ok(Ok(blocks))
}

/// Asks peers in `order` that listed `digest`, stopping at the first verified copy.
async fn retrieve_block(
    digest: &Digest,
    order: &[usize],
    holdings: &[HashSet<Digest>],
    system: &System,
) -> Result<Option<Block>> {
    for &index in order {
        if !holdings[index].contains(digest) {
            continue;
        }

        let block = match system.peer(index).send_get_block(digest, system).await {
            Ok(block) => block,
            Err(e) if matches!(e.downcast_ref::<RpcError>(), Some(RpcError::NotFound { .. })) => {
                warn!("Peer {index} no longer holds {}, trying next. ", digest.short());
                continue;
            },
            Err(e) => return Err(e),
        };

        if block.digest() != *digest {
            warn!("Peer {index} returned corrupt data for {}, trying next. ", digest.short());
            continue;
        }

        debug!("Block {} from peer {index}. ", digest.short());
        return Ok(Some(block));
    }

    Ok(None)
}

async fn write_file(base_dir: &Path, name: &str, blocks: &[Block]) -> Result<()> {
    let mut file = File::create(base_dir.join(name)).await?;
    for block in blocks {
        file.write_all(block).await?;
    }
    file.flush().await?;
    Ok(())
}

/// Names handed out by peers must stay inside the base directory.
fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{placement::Policy, test_util::*, transfer::upload};

    async fn upload_dir(cluster: &TestCluster, dir: &Path, block_size: usize, policy: Policy) {
        let settings = upload_settings(dir, block_size, policy);
        let mut rng = StdRng::seed_from_u64(17);
        upload(&settings, &cluster.system, &mut rng).await.unwrap();
    }

    fn sample_files(dir: &Path) {
        let mut rng = StdRng::seed_from_u64(23);
        let big: Vec<u8> = (0..1000).map(|_| rand::Rng::gen(&mut rng)).collect();

        std::fs::write(dir.join("big.bin"), big).unwrap();
        std::fs::write(dir.join("ten"), b"0123456789").unwrap();
        std::fs::write(dir.join("empty"), b"").unwrap();
    }

    fn assert_same_files(src: &Path, dst: &Path, names: &[&str]) {
        for name in names {
            let expected = std::fs::read(src.join(name)).unwrap();
            let actual = std::fs::read(dst.join(name)).unwrap();
            assert_eq!(actual, expected, "{name} differs");
        }
    }

    #[tokio::test]
    async fn local_policy_round_trip() {
        let cluster = TestCluster::start(3).await;
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        sample_files(src.path());

        upload_dir(&cluster, src.path(), 64, Policy::Local).await;

        let report = download(&download_settings(dst.path(), 64), &cluster.system).await.unwrap();
        assert!(report.failed.is_empty());
        assert_eq!(report.files, 3);
        assert_eq!(report.blocks, 16 + 1);
        assert_same_files(src.path(), dst.path(), &["big.bin", "ten", "empty"]);
    }

    #[tokio::test]
    async fn scattered_blocks_are_reassembled() {
        let cluster = TestCluster::start(4).await;
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        sample_files(src.path());

        upload_dir(&cluster, src.path(), 7, Policy::Random).await;

        let report = download(&download_settings(dst.path(), 7), &cluster.system).await.unwrap();
        assert!(report.failed.is_empty());
        assert_same_files(src.path(), dst.path(), &["big.bin", "ten", "empty"]);
    }

    #[tokio::test]
    async fn missing_block_fails_only_that_file() {
        let cluster = TestCluster::start(2).await;
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("good"), b"intact content").unwrap();
        upload_dir(&cluster, src.path(), 4, Policy::TwoRandom).await;

        let lost = Digest::of(b"never stored anywhere");
        let broken = FileMetadata::new(vec![Digest::of(b"inta"), lost.clone()]);
        for peer in &cluster.system.peers {
            peer.send_record_file("broken", &broken, &cluster.system).await.unwrap();
        }

        let report = download(&download_settings(dst.path(), 4), &cluster.system).await.unwrap();
        assert_eq!(report.files, 1);
        assert_eq!(report.failed.len(), 1);
        match &report.failed[0] {
            DownloadError::BlockUnavailable { file, digest, peers_checked } => {
                assert_eq!(file, "broken");
                assert_eq!(digest, &lost);
                let mut checked = peers_checked.clone();
                checked.sort();
                assert_eq!(checked, vec![0, 1]);
            },
            other => panic!("unexpected failure {other:?}"),
        }

        assert_same_files(src.path(), dst.path(), &["good"]);
        assert!(!dst.path().join("broken").exists(), "no truncated output");
        assert!(report.into_result().is_err());
    }

    #[tokio::test]
    async fn corrupt_copies_are_skipped() {
        let cluster = TestCluster::start(3).await;
        let dst = tempfile::tempdir().unwrap();
        let system = &cluster.system;

        let good = Block::from(&b"genuine"[..]);
        let digest = good.digest();
        let bogus = Block::from(&b"tampered"[..]);

        system.peer(0).send_store_block(&digest, &bogus, system).await.unwrap();
        system.peer(1).send_store_block(&digest, &bogus, system).await.unwrap();
        system.peer(2).send_store_block(&digest, &good, system).await.unwrap();

        let metadata = FileMetadata::new(vec![digest.clone(), digest]);
        for peer in &system.peers {
            peer.send_record_file("twice", &metadata, system).await.unwrap();
        }

        let report = download(&download_settings(dst.path(), 16), system).await.unwrap();
        assert!(report.failed.is_empty());
        assert_eq!(std::fs::read(dst.path().join("twice")).unwrap(), b"genuinegenuine");
    }

    #[tokio::test]
    async fn stale_holder_falls_through_to_the_next_peer() {
        let cluster = TestCluster::start(2).await;
        let system = &cluster.system;

        let block = Block::from(&b"only on peer one"[..]);
        let digest = block.digest();
        system.peer(1).send_store_block(&digest, &block, system).await.unwrap();

        let err = system.peer(0).send_get_block(&digest, system).await.unwrap_err();
        assert!(
            matches!(err.downcast_ref::<RpcError>(), Some(RpcError::NotFound { peer: 0, .. })),
            "{err}",
        );

        // listing taken while peer 0 still claimed the block
        let holdings = vec![HashSet::from([digest.clone()]), HashSet::from([digest.clone()])];
        let found = retrieve_block(&digest, &[0, 1], &holdings, system).await.unwrap();
        assert_eq!(found, Some(block));
    }

    #[tokio::test]
    async fn unsafe_names_are_not_written() {
        let cluster = TestCluster::start(1).await;
        let dst = tempfile::tempdir().unwrap();
        let system = &cluster.system;

        let metadata = FileMetadata::new(vec![]);
        system.peer(0).send_record_file("../escape", &metadata, system).await.unwrap();

        let report = download(&download_settings(dst.path(), 16), system).await.unwrap();
        assert_eq!(report.failed, vec![DownloadError::UnsafeFileName(String::from("../escape"))]);
        assert!(!dst.path().parent().unwrap().join("escape").exists());
    }

    #[test]
    fn file_name_rules() {
        assert!(is_safe_file_name("report.pdf"));
        assert!(is_safe_file_name(".profile"));
        assert!(!is_safe_file_name(""));
        assert!(!is_safe_file_name(".."));
        assert!(!is_safe_file_name("a/b"));
        assert!(!is_safe_file_name("a\\b"));
    }
}
