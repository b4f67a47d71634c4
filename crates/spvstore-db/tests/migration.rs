//! Hand-crafts a V1 store file on disk, then opens it with V2 semantics and
//! asserts the migration preserves every live record and the chain head.

use std::fs::File;
use std::io::Write;

use spvstore_db::{
    BlockStoreError, ChainWork, MappedRingStore, NetworkParams, OpenParams, RecordVersion,
    StoredBlock,
};
use tempfile::tempdir;

struct TestParams;
impl NetworkParams for TestParams {
    fn genesis_block(&self) -> StoredBlock {
        StoredBlock::new([0u8; 80], ChainWork::zero(), 0)
    }
}

const PROLOGUE: usize = 4096;
const RECORD_V1: usize = 32 + 12 + 4 + 80;

fn header_with_nonce(n: u8) -> [u8; 80] {
    let mut h = [0u8; 80];
    h[79] = n;
    h
}

/// Writes a minimal, valid V1 file: genesis at slot 0, one extra block at
/// slot 1, cursor parked right after slot 1, chain head pointing at the
/// extra block.
fn write_v1_fixture(path: &std::path::Path, capacity: u32) {
    use spvstore_codec::{block_hash, encode_body};

    let genesis = StoredBlock::new([0u8; 80], ChainWork::zero(), 0);
    let b1 = StoredBlock::new(header_with_nonce(1), ChainWork::from_u64(5), 1);

    let size = PROLOGUE as u64 + capacity as u64 * RECORD_V1 as u64;
    let mut buf = vec![0u8; size as usize];
    buf[0..4].copy_from_slice(b"SPV1");

    let cursor = (PROLOGUE + 2 * RECORD_V1) as u32;
    buf[4..8].copy_from_slice(&cursor.to_le_bytes());

    let head_hash = block_hash(&b1.header);
    buf[8..40].copy_from_slice(&head_hash.0);

    let slot0 = PROLOGUE;
    buf[slot0..slot0 + 32].copy_from_slice(&genesis.hash().0);
    let body0 = encode_body(&genesis, RecordVersion::V1).unwrap();
    buf[slot0 + 32..slot0 + RECORD_V1].copy_from_slice(&body0);

    let slot1 = PROLOGUE + RECORD_V1;
    buf[slot1..slot1 + 32].copy_from_slice(&b1.hash().0);
    let body1 = encode_body(&b1, RecordVersion::V1).unwrap();
    buf[slot1 + 32..slot1 + RECORD_V1].copy_from_slice(&body1);

    let mut file = File::create(path).unwrap();
    file.write_all(&buf).unwrap();
}

#[test]
fn v1_store_migrates_to_v2_preserving_live_records_and_head() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("legacy.bin");
    write_v1_fixture(&path, 4);

    let store = MappedRingStore::open(
        OpenParams {
            path: path.clone(),
            capacity: 4,
            grow_ok: true,
            version: RecordVersion::V2,
            allow_migrate: true,
        },
        &TestParams,
    )
    .unwrap();

    let genesis = StoredBlock::new([0u8; 80], ChainWork::zero(), 0);
    let b1 = StoredBlock::new(header_with_nonce(1), ChainWork::from_u64(5), 1);

    assert_eq!(store.get(&genesis.hash()), Some(genesis));
    assert_eq!(store.get(&b1.hash()), Some(b1.clone()));
    assert_eq!(store.get_chain_head(), b1);
    assert_eq!(store.version(), RecordVersion::V2);
}

#[test]
fn migration_without_opt_in_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("legacy.bin");
    write_v1_fixture(&path, 4);

    let result = MappedRingStore::open(
        OpenParams {
            path,
            capacity: 4,
            grow_ok: true,
            version: RecordVersion::V2,
            allow_migrate: false,
        },
        &TestParams,
    );
    assert!(matches!(result, Err(BlockStoreError::BadMagic)));
}
