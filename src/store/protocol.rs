use serde::{Deserialize, Serialize};

use crate::block::{Block, Digest, FileMetadata, FileMetadataMap};

#[derive(Serialize)]
pub enum Request<'a> {
    Ping,
    GetBlock(&'a Digest),
    StoreBlock(&'a Digest, &'a Block),
    GetFileInfoMap,
    RecordFile(&'a str, &'a FileMetadata),
    GetStoredBlocks,
}

#[derive(Deserialize, Debug)]
pub enum IncomingRequest {
    Ping,
    GetBlock(Digest),
    StoreBlock(Digest, Block),
    GetFileInfoMap,
    RecordFile(String, FileMetadata),
    GetStoredBlocks,
}

#[derive(Serialize)]
pub enum Response<'a> {
    Ping,
    GetBlock(&'a Block),
    StoreBlock,
    GetFileInfoMap(&'a FileMetadataMap),
    RecordFile,
    GetStoredBlocks(&'a Vec<Digest>),
}

#[derive(Deserialize, Debug)]
pub enum IncomingResponse {
    Ping,
    GetBlock(Block),
    StoreBlock,
    GetFileInfoMap(FileMetadataMap),
    RecordFile,
    GetStoredBlocks(Vec<Digest>),
}

impl Request<'_> {
    pub fn method(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::GetBlock(_) => "get_block",
            Request::StoreBlock(_, _) => "store_block",
            Request::GetFileInfoMap => "get_file_info_map",
            Request::RecordFile(_, _) => "record_file",
            Request::GetStoredBlocks => "get_stored_blocks",
        }
    }
}
