//! Fixed-width record codec: encodes/decodes a [`StoredBlock`] body (the
//! bytes that follow the 32-byte hash prefix in an on-disk slot or
//! checkpoint archive entry). Pure; the only errors are malformed length
//! and chain-work overflow.

use crate::chain_work::ChainWork;
use crate::error::CodecError;
use crate::stored_block::{StoredBlock, BLOCK_HEADER_BYTES};

pub const HEIGHT_BYTES: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordVersion {
    V1,
    V2,
}

impl RecordVersion {
    /// Width in bytes of the `chain_work` field for this version.
    pub const fn work_bytes(self) -> usize {
        match self {
            RecordVersion::V1 => 12,
            RecordVersion::V2 => 32,
        }
    }

    /// Width in bytes of the compact-serialized StoredBlock body (excludes
    /// the 32-byte hash prefix carried by the enclosing slot/archive entry).
    pub const fn body_len(self) -> usize {
        self.work_bytes() + HEIGHT_BYTES + BLOCK_HEADER_BYTES
    }

    /// Full on-disk record width, including the 32-byte hash prefix.
    pub const fn record_len(self) -> usize {
        32 + self.body_len()
    }

    /// Infer a version from a decoded body length, as the checkpoint
    /// archive reader must (it carries no explicit version tag per record).
    pub fn from_body_len(len: usize) -> Option<RecordVersion> {
        if len == RecordVersion::V1.body_len() {
            Some(RecordVersion::V1)
        } else if len == RecordVersion::V2.body_len() {
            Some(RecordVersion::V2)
        } else {
            None
        }
    }
}

/// Encode a StoredBlock body for `version`. Does not include the hash.
pub fn encode_body(block: &StoredBlock, version: RecordVersion) -> Result<Vec<u8>, CodecError> {
    if block.height < 0 {
        return Err(CodecError::NegativeHeight {
            height: block.height,
        });
    }
    let mut out = Vec::with_capacity(version.body_len());
    out.extend_from_slice(&block.chain_work.to_be_bytes(version.work_bytes())?);
    out.extend_from_slice(&block.height.to_be_bytes());
    out.extend_from_slice(&block.header);
    debug_assert_eq!(out.len(), version.body_len());
    Ok(out)
}

/// Decode a StoredBlock body previously produced by `encode_body`.
pub fn decode_body(data: &[u8], version: RecordVersion) -> Result<StoredBlock, CodecError> {
    let expected = version.body_len();
    if data.len() != expected {
        return Err(CodecError::BadLength {
            expected,
            actual: data.len(),
        });
    }
    let work_bytes = version.work_bytes();
    let chain_work = ChainWork::from_be_bytes(&data[0..work_bytes]);
    let height = i32::from_be_bytes(data[work_bytes..work_bytes + HEIGHT_BYTES].try_into().unwrap());
    if height < 0 {
        return Err(CodecError::NegativeHeight { height });
    }
    let mut header = [0u8; BLOCK_HEADER_BYTES];
    header.copy_from_slice(&data[work_bytes + HEIGHT_BYTES..]);
    Ok(StoredBlock::new(header, chain_work, height))
}
