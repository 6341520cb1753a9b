use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::block::Digest;

/// Version stamped on every uploaded file. Nothing increments it yet.
pub const INITIAL_VERSION: u32 = 1;

/// Where a file's bytes live: the ordered digests of its blocks.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct FileMetadata {
    pub version: u32,
    pub block_digests: Vec<Digest>,
}

/// Filename to metadata, ordered by filename.
pub type FileMetadataMap = BTreeMap<String, FileMetadata>;

impl FileMetadata {
    pub fn new(block_digests: Vec<Digest>) -> Self {
        Self {
            version: INITIAL_VERSION,
            block_digests,
        }
    }

    pub fn block_count(&self) -> usize {
        self.block_digests.len()
    }
}
