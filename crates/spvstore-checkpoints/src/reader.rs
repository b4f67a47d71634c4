//! Checkpoint archive reader: sniffs binary vs textual framing, decodes the
//! embedded records, and computes the integrity digest that must agree
//! byte-for-byte between the two forms.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use spvstore_codec::{decode_body, NetworkParams, RecordVersion, StoredBlock};

use crate::error::CheckpointError;

const BINARY_MAGIC: &[u8] = b"CHECKPOINTS 1";
const TEXTUAL_MAGIC: &str = "TXT CHECKPOINTS 1";
const SIGNATURE_BYTES: usize = 65;
const MAX_SIGNATURES: u32 = 256;

/// A parsed checkpoint archive: signatures verbatim, the integrity digest
/// over the checkpoint section, and checkpoints keyed by header timestamp.
pub struct CheckpointArchive {
    pub signatures: Vec<[u8; SIGNATURE_BYTES]>,
    pub data_hash: [u8; 32],
    checkpoints: BTreeMap<u32, StoredBlock>,
}

impl CheckpointArchive {
    /// Sniffs the first byte to discriminate binary ('C') from textual ('T') framing.
    pub fn parse(data: &[u8]) -> Result<Self, CheckpointError> {
        match data.first() {
            Some(b'T') => parse_textual(data),
            Some(_) => parse_binary(data),
            None => Err(CheckpointError::Truncated),
        }
    }

    /// Signatures are read but never verified in this build; the bytes are
    /// preserved on `signatures` for a future verifier to consume.
    pub fn verify_signatures(&self) -> Result<(), CheckpointError> {
        Err(CheckpointError::SignaturesNotVerified)
    }

    /// The greatest-timestamp checkpoint with timestamp <= `t`, or a
    /// synthesized genesis if no checkpoint applies.
    pub fn checkpoint_before(&self, t: u32, params: &impl NetworkParams) -> StoredBlock {
        self.checkpoints
            .range(..=t)
            .next_back()
            .map(|(_, block)| block.clone())
            .unwrap_or_else(|| params.genesis_block())
    }

    /// `checkpoint_before(t)` plus its height-minus-one companion, oldest
    /// first. Accommodates the Litecoin-vs-Bitcoin difficulty retarget
    /// window difference: downstream validators need both the transition
    /// block and its predecessor. If the primary is a synthesized genesis
    /// (no checkpoint applies) or the predecessor is absent, returns fewer.
    pub fn checkpoints_before(&self, t: u32, params: &impl NetworkParams) -> Vec<StoredBlock> {
        let genesis = params.genesis_block();
        let primary = self.checkpoint_before(t, params);
        if primary == genesis {
            return vec![genesis];
        }
        let companion = self
            .checkpoints
            .values()
            .find(|block| block.height == primary.height - 1)
            .cloned();
        match companion {
            Some(companion) => vec![companion, primary],
            None => vec![primary],
        }
    }
}

fn read_u32_be(data: &[u8], offset: usize) -> Result<u32, CheckpointError> {
    let bytes = data
        .get(offset..offset + 4)
        .ok_or(CheckpointError::Truncated)?;
    Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
}

fn decode_records(
    body: &[u8],
    count: u32,
    record_len: usize,
    version: RecordVersion,
) -> Result<BTreeMap<u32, StoredBlock>, CheckpointError> {
    let mut map = BTreeMap::new();
    for i in 0..count as usize {
        let start = i * record_len;
        let chunk = body
            .get(start..start + record_len)
            .ok_or(CheckpointError::Truncated)?;
        let block = decode_body(chunk, version)?;
        map.insert(block.timestamp(), block);
    }
    Ok(map)
}

fn parse_binary(data: &[u8]) -> Result<CheckpointArchive, CheckpointError> {
    if data.len() < BINARY_MAGIC.len() || &data[..BINARY_MAGIC.len()] != BINARY_MAGIC {
        return Err(CheckpointError::BadMagic);
    }
    let mut pos = BINARY_MAGIC.len();

    let num_signatures = read_u32_be(data, pos)?;
    pos += 4;
    if num_signatures > MAX_SIGNATURES {
        return Err(CheckpointError::Truncated);
    }

    let sig_section_len = num_signatures as usize * SIGNATURE_BYTES;
    let sig_bytes = data
        .get(pos..pos + sig_section_len)
        .ok_or(CheckpointError::Truncated)?;
    let signatures = sig_bytes
        .chunks_exact(SIGNATURE_BYTES)
        .map(|chunk| chunk.try_into().unwrap())
        .collect();
    pos += sig_section_len;

    let digest_start = pos;
    let num_checkpoints = read_u32_be(data, pos)?;
    pos += 4;
    if num_checkpoints == 0 {
        return Err(CheckpointError::Truncated);
    }

    let record_section = &data[pos..];
    if record_section.is_empty() || record_section.len() % num_checkpoints as usize != 0 {
        return Err(CheckpointError::UnknownRecordLength(record_section.len()));
    }
    let record_len = record_section.len() / num_checkpoints as usize;
    let version = RecordVersion::from_body_len(record_len)
        .ok_or(CheckpointError::UnknownRecordLength(record_len))?;

    let checkpoints = decode_records(record_section, num_checkpoints, record_len, version)?;

    let mut data_hash = [0u8; 32];
    data_hash.copy_from_slice(&Sha256::digest(&data[digest_start..]));

    Ok(CheckpointArchive {
        signatures,
        data_hash,
        checkpoints,
    })
}

fn parse_textual(data: &[u8]) -> Result<CheckpointArchive, CheckpointError> {
    let text = std::str::from_utf8(data).map_err(|_| CheckpointError::BadMagic)?;
    let mut lines = text.lines();

    let magic = lines.next().ok_or(CheckpointError::Truncated)?;
    if magic != TEXTUAL_MAGIC {
        return Err(CheckpointError::BadMagic);
    }

    let num_signatures: u32 = lines
        .next()
        .ok_or(CheckpointError::Truncated)?
        .parse()
        .map_err(|_| CheckpointError::Truncated)?;
    if num_signatures > MAX_SIGNATURES {
        return Err(CheckpointError::Truncated);
    }
    let mut signatures = Vec::with_capacity(num_signatures as usize);
    for _ in 0..num_signatures {
        let line = lines.next().ok_or(CheckpointError::Truncated)?;
        let raw = STANDARD_NO_PAD.decode(line)?;
        let sig: [u8; SIGNATURE_BYTES] = raw
            .as_slice()
            .try_into()
            .map_err(|_| CheckpointError::Truncated)?;
        signatures.push(sig);
    }

    let num_checkpoints: u32 = lines
        .next()
        .ok_or(CheckpointError::Truncated)?
        .parse()
        .map_err(|_| CheckpointError::Truncated)?;
    if num_checkpoints == 0 {
        return Err(CheckpointError::Truncated);
    }

    let mut checkpoints = BTreeMap::new();
    let mut digest_input = Vec::from(num_checkpoints.to_be_bytes());
    for _ in 0..num_checkpoints {
        let line = lines.next().ok_or(CheckpointError::Truncated)?;
        let raw = STANDARD_NO_PAD.decode(line)?;
        let version = RecordVersion::from_body_len(raw.len())
            .ok_or(CheckpointError::UnknownRecordLength(raw.len()))?;
        let block = decode_body(&raw, version)?;
        checkpoints.insert(block.timestamp(), block);
        digest_input.extend_from_slice(&raw);
    }

    let mut data_hash = [0u8; 32];
    data_hash.copy_from_slice(&Sha256::digest(&digest_input));

    Ok(CheckpointArchive {
        signatures,
        data_hash,
        checkpoints,
    })
}
