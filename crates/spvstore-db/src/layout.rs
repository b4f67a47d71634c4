//! On-disk byte layout: prologue field offsets and slot addressing.
//!
//! The mapped region is never deserialized into owned objects on the hot
//! path — callers slice the raw bytes and hand them to
//! [`spvstore_codec::decode_body`] directly.

use spvstore_codec::RecordVersion;

/// Bytes reserved ahead of the slot array. Generously larger than the 40
/// bytes currently occupied (magic + cursor + head hash) so future prologue
/// fields never force a layout break.
pub const FILE_PROLOGUE_BYTES: usize = 4096;

pub const MAGIC_OFFSET: usize = 0;
pub const MAGIC_LEN: usize = 4;
pub const CURSOR_OFFSET: usize = 4;
pub const HEAD_HASH_OFFSET: usize = 8;
pub const HEAD_HASH_LEN: usize = 32;

/// "SPVB"-V1: the legacy magic, kept bit-exact with historically emitted V1 files.
pub const MAGIC_V1: [u8; MAGIC_LEN] = *b"SPV1";
/// "SPVB": the current (V2) magic.
pub const MAGIC_V2: [u8; MAGIC_LEN] = *b"SPVB";

pub fn magic_for(version: RecordVersion) -> [u8; MAGIC_LEN] {
    match version {
        RecordVersion::V1 => MAGIC_V1,
        RecordVersion::V2 => MAGIC_V2,
    }
}

pub fn version_for_magic(magic: &[u8]) -> Option<RecordVersion> {
    if magic == MAGIC_V1 {
        Some(RecordVersion::V1)
    } else if magic == MAGIC_V2 {
        Some(RecordVersion::V2)
    } else {
        None
    }
}

/// Total file size in bytes for `capacity` slots of `version`'s record width.
pub fn file_size_for(capacity: u32, version: RecordVersion) -> u64 {
    FILE_PROLOGUE_BYTES as u64 + capacity as u64 * version.record_len() as u64
}

/// Byte offset of slot `index` (0-based) within the slot array.
pub fn slot_offset(index: u32, version: RecordVersion) -> usize {
    FILE_PROLOGUE_BYTES + index as usize * version.record_len()
}

/// Ring-cursor byte offset -> slot index, given the active version's record width.
pub fn cursor_to_slot_index(cursor: u32, version: RecordVersion) -> u32 {
    ((cursor as usize - FILE_PROLOGUE_BYTES) / version.record_len()) as u32
}
