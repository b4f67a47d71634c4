//! One-shot seeding of a fresh SPV store from a checkpoint archive.

use tracing::{info, warn};

use spvstore_codec::NetworkParams;
use spvstore_db::BlockStore;

use crate::reader::CheckpointArchive;

const SECONDS_PER_DAY: u64 = 86_400;
const BIRTHDAY_LOOKBACK_DAYS: u64 = 7;

/// Seeds `store` from `archive`, anchored `7` days before `wallet_birthday_secs`.
/// Requires `store` to be a fresh SPV-kind store (an empty/genesis-only ring);
/// seeding over a populated store would interleave checkpoint and validated
/// history in the same ring with no way to tell them apart afterward.
pub fn seed(
    store: &impl BlockStore,
    archive: &CheckpointArchive,
    wallet_birthday_secs: u64,
    params: &impl NetworkParams,
) {
    let anchor = wallet_birthday_secs.saturating_sub(BIRTHDAY_LOOKBACK_DAYS * SECONDS_PER_DAY);
    let anchor = u32::try_from(anchor).unwrap_or(u32::MAX);
    let checkpoints = archive.checkpoints_before(anchor, params);

    for block in &checkpoints {
        if let Err(err) = store.put(block) {
            warn!(height = block.height, error = %err, "dropping checkpoint record during seeding");
        }
    }
    if let Some(last) = checkpoints.last() {
        store.set_chain_head(last);
        info!(
            height = last.height,
            hash = ?last.hash(),
            "seeded SPV store from checkpoint archive"
        );
    }
}
