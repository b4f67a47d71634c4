use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("bad checkpoint archive magic")]
    BadMagic,

    #[error("truncated checkpoint archive")]
    Truncated,

    #[error("unknown checkpoint record length {0}")]
    UnknownRecordLength(usize),

    #[error("checkpoint archive integrity hash mismatch")]
    IntegrityMismatch,

    #[error("checkpoint signatures are not verified in this build")]
    SignaturesNotVerified,

    #[error("record codec error: {0}")]
    Codec(#[from] spvstore_codec::CodecError),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
