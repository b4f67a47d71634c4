//! `spvstore-codec` — the record codec and data model shared by the mapped
//! ring store and the checkpoint archive reader.
//!
//! This crate MUST stay pure: no filesystem, no locking, no mmap. Those
//! concerns live in `spvstore-db` and `spvstore-checkpoints`.

mod chain_work;
mod error;
mod record;
mod stored_block;

pub use chain_work::ChainWork;
pub use error::CodecError;
pub use record::{decode_body, encode_body, RecordVersion, HEIGHT_BYTES};
pub use stored_block::{block_hash, BlockHash, StoredBlock, BLOCK_HEADER_BYTES};

/// Collaborator contract: supplies the network's genesis header so the
/// mapped store and checkpoint reader can synthesize an empty-store
/// response without depending on the (out-of-scope) validation engine.
pub trait NetworkParams {
    fn genesis_block(&self) -> StoredBlock;
}
