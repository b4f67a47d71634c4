//! Cumulative chain work: a non-negative big integer accumulated across
//! headers. Stored on disk as a fixed-width big-endian field whose width
//! depends on the active record version (see [`crate::record::RecordVersion`]).

use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::CodecError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChainWork(BigUint);

impl ChainWork {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn from_u64(v: u64) -> Self {
        Self(BigUint::from(v))
    }

    pub fn from_biguint(v: BigUint) -> Self {
        Self(v)
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn to_be_bytes(&self, width: usize) -> Result<Vec<u8>, CodecError> {
        let raw = self.0.to_bytes_be();
        if raw.len() > width {
            return Err(CodecError::WorkOverflow { max_bytes: width });
        }
        let mut out = vec![0u8; width];
        out[width - raw.len()..].copy_from_slice(&raw);
        Ok(out)
    }

    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        Self(BigUint::from_bytes_be(bytes))
    }
}

impl std::fmt::Display for ChainWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_roundtrips_at_any_width() {
        let w = ChainWork::zero();
        let bytes = w.to_be_bytes(12).unwrap();
        assert_eq!(bytes, vec![0u8; 12]);
        assert_eq!(ChainWork::from_be_bytes(&bytes), w);
    }

    #[test]
    fn overflow_detected_for_narrow_width() {
        // 2^96 does not fit in 12 bytes (96 bits).
        let huge = ChainWork::from_biguint(BigUint::from(1u8) << 96);
        assert_eq!(
            huge.to_be_bytes(12),
            Err(CodecError::WorkOverflow { max_bytes: 12 })
        );
        // but it fits comfortably in 32 bytes.
        assert!(huge.to_be_bytes(32).is_ok());
    }
}
