use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("record body: expected {expected} bytes, got {actual}")]
    BadLength { expected: usize, actual: usize },

    #[error("chain work does not fit in {max_bytes} bytes; upgrade to a wider record version")]
    WorkOverflow { max_bytes: usize },

    #[error("height must be >= 0, got {height}")]
    NegativeHeight { height: i32 },
}
