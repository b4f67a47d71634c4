use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

use spvstore_checkpoints::{seed, CheckpointArchive, CheckpointError};
use spvstore_codec::{encode_body, ChainWork, NetworkParams, RecordVersion, StoredBlock};
use spvstore_db::{MappedRingStore, OpenParams};
use tempfile::tempdir;

struct TestParams;
impl NetworkParams for TestParams {
    fn genesis_block(&self) -> StoredBlock {
        StoredBlock::new([0u8; 80], ChainWork::zero(), 0)
    }
}

fn header_with(timestamp: u32, nonce: u8) -> [u8; 80] {
    let mut h = [0u8; 80];
    h[68..72].copy_from_slice(&timestamp.to_le_bytes());
    h[79] = nonce;
    h
}

fn sample_checkpoints() -> Vec<StoredBlock> {
    vec![
        StoredBlock::new(header_with(1_000, 1), ChainWork::from_u64(10), 2015),
        StoredBlock::new(header_with(2_000, 2), ChainWork::from_u64(20), 2016),
        StoredBlock::new(header_with(3_000, 3), ChainWork::from_u64(30), 4032),
    ]
}

fn build_binary_archive(blocks: &[StoredBlock], version: RecordVersion) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"CHECKPOINTS 1");
    out.extend_from_slice(&0u32.to_be_bytes()); // num_signatures
    out.extend_from_slice(&(blocks.len() as u32).to_be_bytes());
    for block in blocks {
        out.extend_from_slice(&encode_body(block, version).unwrap());
    }
    out
}

fn build_textual_archive(blocks: &[StoredBlock], version: RecordVersion) -> Vec<u8> {
    let mut out = String::new();
    out.push_str("TXT CHECKPOINTS 1\n");
    out.push_str("0\n");
    out.push_str(&format!("{}\n", blocks.len()));
    for block in blocks {
        let body = encode_body(block, version).unwrap();
        out.push_str(&STANDARD_NO_PAD.encode(body));
        out.push('\n');
    }
    out.into_bytes()
}

#[test]
fn binary_and_textual_digests_agree() {
    let blocks = sample_checkpoints();
    let binary = build_binary_archive(&blocks, RecordVersion::V2);
    let textual = build_textual_archive(&blocks, RecordVersion::V2);

    let binary_archive = CheckpointArchive::parse(&binary).unwrap();
    let textual_archive = CheckpointArchive::parse(&textual).unwrap();

    assert_eq!(binary_archive.data_hash, textual_archive.data_hash);
}

#[test]
fn checkpoint_before_finds_greatest_not_exceeding() {
    let blocks = sample_checkpoints();
    let archive = CheckpointArchive::parse(&build_binary_archive(&blocks, RecordVersion::V2)).unwrap();

    let found = archive.checkpoint_before(2_500, &TestParams);
    assert_eq!(found.height, 2016);

    let earliest = archive.checkpoint_before(500, &TestParams);
    assert_eq!(earliest.height, 0); // falls back to genesis
}

#[test]
fn checkpoints_before_includes_height_minus_one_companion() {
    let blocks = sample_checkpoints();
    let archive = CheckpointArchive::parse(&build_binary_archive(&blocks, RecordVersion::V2)).unwrap();

    let result = archive.checkpoints_before(2_500, &TestParams);
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].height, 2015);
    assert_eq!(result[1].height, 2016);
}

#[test]
fn checkpoints_before_omits_companion_when_absent() {
    let blocks = sample_checkpoints();
    let archive = CheckpointArchive::parse(&build_binary_archive(&blocks, RecordVersion::V2)).unwrap();

    let result = archive.checkpoints_before(3_500, &TestParams);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].height, 4032);
}

#[test]
fn bad_magic_is_rejected() {
    let mut buf = b"NOT A CHECKPOINT".to_vec();
    buf.extend_from_slice(&[0u8; 16]);
    assert!(matches!(
        CheckpointArchive::parse(&buf),
        Err(CheckpointError::BadMagic)
    ));
}

#[test]
fn verify_signatures_is_an_explicit_unimplemented_hook() {
    let blocks = sample_checkpoints();
    let archive = CheckpointArchive::parse(&build_binary_archive(&blocks, RecordVersion::V2)).unwrap();
    assert!(matches!(
        archive.verify_signatures(),
        Err(CheckpointError::SignaturesNotVerified)
    ));
}

#[test]
fn seeder_puts_checkpoints_and_sets_head() {
    let dir = tempdir().unwrap();
    let store = MappedRingStore::open(
        OpenParams {
            path: dir.path().join("spv.bin"),
            capacity: 16,
            grow_ok: false,
            version: RecordVersion::V2,
            allow_migrate: false,
        },
        &TestParams,
    )
    .unwrap();

    let blocks = sample_checkpoints();
    let archive = CheckpointArchive::parse(&build_binary_archive(&blocks, RecordVersion::V2)).unwrap();

    // anchor = birthday - 7 days lands at t=2_500, strictly between the
    // 2_000s and 3_000s checkpoints.
    let wallet_birthday: u64 = 2_500 + 7 * 86_400;
    seed(&store, &archive, wallet_birthday, &TestParams);

    let head = store.get_chain_head();
    assert_eq!(head.height, 2016);
    assert!(store.contains(&head.hash()));
}
