use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlockStoreError {
    #[error("store file is locked by another process")]
    FileLocked,

    #[error("bad magic bytes in store file")]
    BadMagic,

    #[error("capacity mismatch: requested {requested}, actual {actual}")]
    CapacityMismatch { requested: u32, actual: u32 },

    #[error("store shrink not allowed (requested {requested} < actual {actual})")]
    ShrinkNotAllowed { requested: u32, actual: u32 },

    #[error("store corrupt: {reason}")]
    Corrupt { reason: String },

    #[error("record codec error: {0}")]
    Codec(#[from] spvstore_codec::CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
