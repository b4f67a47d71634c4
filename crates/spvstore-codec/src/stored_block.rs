use sha2::{Digest, Sha256};

use crate::chain_work::ChainWork;

pub const BLOCK_HEADER_BYTES: usize = 80;

/// A 32-byte block identity hash, big-endian as stored on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub const ZERO: BlockHash = BlockHash([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Interpret the first 4 bytes as an unsigned little-endian integer,
    /// used by the mapped ring store to pick a probe start slot.
    pub fn probe_seed(&self) -> u32 {
        u32::from_le_bytes(self.0[0..4].try_into().unwrap())
    }
}

/// Double-SHA-256 over the raw header bytes — the Bitcoin/Litecoin block
/// identity hash. Distinct from proof-of-work target verification, which is
/// the validation engine's job and is never performed here.
pub fn block_hash(header: &[u8; BLOCK_HEADER_BYTES]) -> BlockHash {
    let first = Sha256::digest(header);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    BlockHash(out)
}

/// Immutable triple: raw header bytes, cumulative chain work, height.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlock {
    pub header: [u8; BLOCK_HEADER_BYTES],
    pub chain_work: ChainWork,
    pub height: i32,
}

impl StoredBlock {
    pub fn new(header: [u8; BLOCK_HEADER_BYTES], chain_work: ChainWork, height: i32) -> Self {
        Self {
            header,
            chain_work,
            height,
        }
    }

    pub fn hash(&self) -> BlockHash {
        block_hash(&self.header)
    }

    /// Header timestamp in seconds, little-endian u32 at header offset 68
    /// (the Bitcoin/Litecoin header layout: version[4] prev[32] merkle[32]
    /// time[4] bits[4] nonce[4]).
    pub fn timestamp(&self) -> u32 {
        u32::from_le_bytes(self.header[68..72].try_into().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_header_hashes_deterministically() {
        let header = [0u8; BLOCK_HEADER_BYTES];
        let h1 = block_hash(&header);
        let h2 = block_hash(&header);
        assert_eq!(h1, h2);
        assert!(!h1.is_zero());
    }

    #[test]
    fn probe_seed_reads_first_four_bytes_le() {
        let mut hash = [0u8; 32];
        hash[0] = 0x01;
        hash[1] = 0x02;
        let bh = BlockHash(hash);
        assert_eq!(bh.probe_seed(), 0x0201);
    }

    #[test]
    fn timestamp_reads_header_offset_68() {
        let mut header = [0u8; BLOCK_HEADER_BYTES];
        header[68..72].copy_from_slice(&1_700_000_000u32.to_le_bytes());
        let block = StoredBlock::new(header, ChainWork::zero(), 0);
        assert_eq!(block.timestamp(), 1_700_000_000);
    }
}
