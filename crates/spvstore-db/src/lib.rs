//! `spvstore-db` — a memory-mapped, fixed-capacity ring store for SPV block
//! headers. Single-writer, many-reader, crash-safe via mmap + fsync-on-close
//! and an atomic-rename migration path between on-disk record versions.

mod cache;
mod error;
mod layout;
mod lock;
mod store;

pub use error::BlockStoreError;
pub use layout::{FILE_PROLOGUE_BYTES, MAGIC_V1, MAGIC_V2};
pub use store::{BlockStore, MappedRingStore, OpenParams};

pub use spvstore_codec::{
    block_hash, decode_body, encode_body, BlockHash, ChainWork, CodecError, NetworkParams,
    RecordVersion, StoredBlock, BLOCK_HEADER_BYTES,
};
