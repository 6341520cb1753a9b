use std::{fmt, num::NonZeroUsize, ops::Deref};

use bytes::Bytes;
use data_encoding::HEXLOWER;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::block::Digest;

/// An immutable run of file bytes, at most one block size long.
///
/// On the wire a block is a lower-case hex string.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Block(Bytes);

impl Block {
    pub fn digest(&self) -> Digest {
        Digest::of(&self.0)
    }
}

impl From<Vec<u8>> for Block {
    fn from(value: Vec<u8>) -> Self {
        Self(Bytes::from(value))
    }
}

impl From<&'static [u8]> for Block {
    fn from(value: &'static [u8]) -> Self {
        Self(Bytes::from_static(value))
    }
}

impl Deref for Block {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&HEXLOWER.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl<'de> de::Visitor<'de> for HexVisitor {
            type Value = Block;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a lower-case hex string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Block, E> {
                let data = HEXLOWER.decode(v.as_bytes()).map_err(E::custom)?;
                Ok(Block::from(data))
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

/// Splits `data` into consecutive blocks of `block_size` bytes, the last one possibly
/// shorter. Empty input yields no blocks. Blocks share the input buffer.
pub fn chunk(data: &Bytes, block_size: NonZeroUsize) -> Vec<Block> {
    let block_size = block_size.get();
    let mut blocks = Vec::with_capacity((data.len() + block_size - 1) / block_size);

    let mut start = 0;
    while start < data.len() {
        let end = usize::min(start + block_size, data.len());
        blocks.push(Block(data.slice(start..end)));
        start = end;
    }

    blocks
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn ten_bytes_in_blocks_of_four() {
        let data = Bytes::from_static(b"0123456789");
        let blocks = chunk(&data, size(4));

        let lengths: Vec<_> = blocks.iter().map(|b| b.len()).collect();
        assert_eq!(lengths, vec![4, 4, 2]);
        assert_eq!(&*blocks[2], b"89");
    }

    #[test]
    fn empty_input_has_no_blocks() {
        assert!(chunk(&Bytes::new(), size(16)).is_empty());
    }

    #[test]
    fn exact_multiple_has_no_short_tail() {
        let data = Bytes::from(vec![7u8; 12]);
        let blocks = chunk(&data, size(4));
        assert_eq!(blocks.len(), 3);
        assert!(blocks.iter().all(|b| b.len() == 4));
    }

    #[test]
    fn concatenation_reproduces_input() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let len = rng.gen_range(0..300);
            let data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let data = Bytes::from(data);
            let block_size = rng.gen_range(1..40);

            let blocks = chunk(&data, size(block_size));
            if let Some((last, full)) = blocks.split_last() {
                assert!(full.iter().all(|b| b.len() == block_size));
                assert!(!last.is_empty() && last.len() <= block_size);
            }

            let joined: Vec<u8> = blocks.iter().flat_map(|b| b.iter().copied()).collect();
            assert_eq!(joined, data.to_vec());
        }
    }

    #[test]
    fn wire_form_is_hex() {
        let block = Block::from(vec![0x00, 0xab, 0xff]);
        assert_eq!(serde_json::to_string(&block).unwrap(), "\"00abff\"");

        let parsed: Block = serde_json::from_str("\"00abff\"").unwrap();
        assert_eq!(parsed, block);
        assert!(serde_json::from_str::<Block>("\"0g\"").is_err());
    }
}
