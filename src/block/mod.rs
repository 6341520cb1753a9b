mod chunker;
mod digest;
mod metadata;

pub use chunker::{chunk, Block};
pub use digest::Digest;
pub use metadata::{FileMetadata, FileMetadataMap};
