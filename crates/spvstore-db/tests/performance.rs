//! Non-regression gate, not a correctness test. Ignored by default; run with
//! `cargo test -- --ignored` on a contemporary workstation.

use std::time::Instant;

use spvstore_db::{ChainWork, MappedRingStore, NetworkParams, OpenParams, RecordVersion, StoredBlock};
use tempfile::tempdir;

struct TestParams;
impl NetworkParams for TestParams {
    fn genesis_block(&self) -> StoredBlock {
        StoredBlock::new([0u8; 80], ChainWork::zero(), 0)
    }
}

#[test]
#[ignore]
fn hundred_thousand_puts_under_five_seconds() {
    let dir = tempdir().unwrap();
    let store = MappedRingStore::open(
        OpenParams {
            path: dir.path().join("perf.bin"),
            capacity: 2_000,
            grow_ok: false,
            version: RecordVersion::V2,
            allow_migrate: false,
        },
        &TestParams,
    )
    .unwrap();

    let start = Instant::now();
    for i in 0..100_000u32 {
        let mut header = [0u8; 80];
        header[0..4].copy_from_slice(&i.to_le_bytes());
        let block = StoredBlock::new(header, ChainWork::from_u64(i as u64), i as i32);
        store.put(&block).unwrap();
        store.set_chain_head(&block);
    }
    let elapsed = start.elapsed();
    assert!(
        elapsed.as_secs_f64() < 5.0,
        "100k put+set_chain_head took {elapsed:?}, budget is 5s"
    );
}
