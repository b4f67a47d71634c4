//! The mapped ring store: a memory-mapped, fixed-capacity, open-addressed
//! hash table whose backing array doubles as a FIFO ring, plus the chain
//! head pointer and the prologue bookkeeping that survives a crash.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use parking_lot::RwLock;
use tracing::{debug, info};

use spvstore_codec::{
    block_hash, decode_body, encode_body, BlockHash, NetworkParams, RecordVersion, StoredBlock,
};

use crate::cache::ProbeCache;
use crate::error::BlockStoreError;
use crate::layout::{
    self, cursor_to_slot_index, file_size_for, magic_for, slot_offset, version_for_magic,
    CURSOR_OFFSET, FILE_PROLOGUE_BYTES, HEAD_HASH_LEN, HEAD_HASH_OFFSET, MAGIC_LEN, MAGIC_OFFSET,
};
use crate::lock;

/// The operational surface shared by every block-store implementation. The
/// checkpoint seeder and other collaborators depend on this rather than on
/// `MappedRingStore` directly.
pub trait BlockStore {
    fn put(&self, block: &StoredBlock) -> Result<(), BlockStoreError>;
    fn get(&self, hash: &BlockHash) -> Option<StoredBlock>;
    fn contains(&self, hash: &BlockHash) -> bool;
    fn get_chain_head(&self) -> StoredBlock;
    fn set_chain_head(&self, block: &StoredBlock);
    fn clear(&self) -> Result<(), BlockStoreError>;
}

/// Parameters for [`MappedRingStore::open`].
pub struct OpenParams {
    pub path: PathBuf,
    pub capacity: u32,
    pub grow_ok: bool,
    pub version: RecordVersion,
    /// Opt-in to an in-place V1 -> V2 migration when an existing file is V1
    /// and `version` is V2. Without this, a version mismatch is fatal.
    pub allow_migrate: bool,
}

pub struct MappedRingStore {
    inner: RwLock<MmapMut>,
    cache: ProbeCache,
    lock_file: parking_lot::Mutex<Option<File>>,
    version: RecordVersion,
    capacity: u32,
    genesis: StoredBlock,
    path: PathBuf,
}

impl MappedRingStore {
    /// `FILE_PROLOGUE_BYTES + capacity * record_width_v2` — the canonical
    /// file size formula for a capacity, expressed in the current (V2)
    /// record width (V1 is legacy and only ever migrated away from).
    pub fn file_size(capacity: u32) -> u64 {
        file_size_for(capacity, RecordVersion::V2)
    }

    pub fn open(
        open_params: OpenParams,
        params: &impl NetworkParams,
    ) -> Result<Self, BlockStoreError> {
        let OpenParams {
            path,
            capacity,
            grow_ok,
            version,
            allow_migrate,
        } = open_params;

        let genesis = params.genesis_block();
        let existed = path.exists() && std::fs::metadata(&path)?.len() > 0;

        let file = lock::open_and_lock(&path)?;

        if !existed {
            debug!(path = %path.display(), capacity, "creating new store file");
            return Self::create_fresh(file, path, capacity, version, genesis);
        }

        let file_len = file.metadata()?.len();
        let mut mmap = unsafe { MmapMut::map_mut(&file)? };
        let magic = mmap[MAGIC_OFFSET..MAGIC_OFFSET + MAGIC_LEN].to_vec();
        let on_disk_version = version_for_magic(&magic).ok_or(BlockStoreError::BadMagic)?;

        if on_disk_version != version {
            if on_disk_version == RecordVersion::V1 && version == RecordVersion::V2 && allow_migrate
            {
                info!(path = %path.display(), "migrating store file V1 -> V2");
                return Self::migrate_v1_to_v2(file, path, capacity, mmap, genesis);
            }
            return Err(BlockStoreError::BadMagic);
        }

        let actual_capacity =
            ((file_len as usize - FILE_PROLOGUE_BYTES) / version.record_len()) as u32;
        if actual_capacity != capacity {
            if capacity < actual_capacity {
                return Err(BlockStoreError::ShrinkNotAllowed {
                    requested: capacity,
                    actual: actual_capacity,
                });
            }
            if !grow_ok {
                return Err(BlockStoreError::CapacityMismatch {
                    requested: capacity,
                    actual: actual_capacity,
                });
            }
            grow_in_place(&file, &mut mmap, actual_capacity, capacity, version)?;
        }

        let cursor = read_cursor(&mmap);
        let max_cursor = layout::slot_offset(capacity, version) as u32;
        if cursor < FILE_PROLOGUE_BYTES as u32 || cursor > max_cursor {
            return Err(BlockStoreError::Corrupt {
                reason: format!("ring cursor {cursor} out of range"),
            });
        }

        Ok(Self {
            inner: RwLock::new(mmap),
            cache: ProbeCache::new(),
            lock_file: parking_lot::Mutex::new(Some(file)),
            version,
            capacity,
            genesis,
            path,
        })
    }

    fn create_fresh(
        file: File,
        path: PathBuf,
        capacity: u32,
        version: RecordVersion,
        genesis: StoredBlock,
    ) -> Result<Self, BlockStoreError> {
        let size = file_size_for(capacity, version);
        file.set_len(size)?;
        let mut mmap = unsafe { MmapMut::map_mut(&file)? };
        zero_prologue_and_write_magic(&mut mmap, version);

        let store = Self {
            inner: RwLock::new(mmap),
            cache: ProbeCache::new(),
            lock_file: parking_lot::Mutex::new(Some(file)),
            version,
            capacity,
            genesis,
            path,
        };
        store.seed_genesis()?;
        Ok(store)
    }

    fn seed_genesis(&self) -> Result<(), BlockStoreError> {
        let genesis = self.genesis.clone();
        let mut mmap = self.inner.write();
        let slot = write_record_at_cursor(&mut mmap, self.capacity, self.version, &genesis)?;
        drop(mmap);
        self.cache.insert(genesis.hash(), slot);
        Ok(())
    }

    fn migrate_v1_to_v2(
        old_file: File,
        path: PathBuf,
        capacity: u32,
        old_mmap: MmapMut,
        genesis: StoredBlock,
    ) -> Result<Self, BlockStoreError> {
        let v1 = RecordVersion::V1;
        let v2 = RecordVersion::V2;

        let old_capacity =
            ((old_file.metadata()?.len() as usize - FILE_PROLOGUE_BYTES) / v1.record_len()) as u32;
        let old_cursor = read_cursor(&old_mmap);
        let oldest_slot = cursor_to_slot_index(old_cursor, v1);

        let mut live: Vec<(BlockHash, StoredBlock)> = Vec::new();
        for step in 0..old_capacity {
            let idx = (oldest_slot + step) % old_capacity;
            let off = slot_offset(idx, v1);
            let hash_bytes = &old_mmap[off..off + 32];
            if hash_bytes.iter().all(|&b| b == 0) {
                continue;
            }
            let mut hash = [0u8; 32];
            hash.copy_from_slice(hash_bytes);
            let body = &old_mmap[off + 32..off + v1.record_len()];
            let block = decode_body(body, v1)?;
            live.push((BlockHash(hash), block));
        }

        let head_hash = read_head_hash(&old_mmap);

        let new_path = path.with_extension("v2migrate.tmp");
        let new_file = File::create(&new_path)?;
        let effective_capacity = capacity.max(live.len() as u32).max(1);
        new_file.set_len(file_size_for(effective_capacity, v2))?;
        let mut new_mmap = unsafe { MmapMut::map_mut(&new_file)? };
        zero_prologue_and_write_magic(&mut new_mmap, v2);

        for (i, (hash, block)) in live.iter().enumerate() {
            let off = slot_offset(i as u32, v2);
            new_mmap[off..off + 32].copy_from_slice(&hash.0);
            let body = encode_body(block, v2)?;
            new_mmap[off + 32..off + v2.record_len()].copy_from_slice(&body);
        }
        let new_cursor = slot_offset(live.len() as u32 % effective_capacity.max(1), v2) as u32;
        write_cursor(&mut new_mmap, new_cursor);
        write_head_hash(&mut new_mmap, &head_hash);
        new_mmap.flush()?;

        drop(new_mmap);
        drop(old_mmap);
        lock::unlock(&old_file);
        drop(old_file);
        std::fs::rename(&new_path, &path)?;

        let file = lock::open_and_lock(&path)?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        let mut cache = ProbeCache::new();
        for (i, (hash, _)) in live.iter().enumerate() {
            cache.insert(*hash, i as u32);
        }

        Ok(Self {
            inner: RwLock::new(mmap),
            cache,
            lock_file: parking_lot::Mutex::new(Some(file)),
            version: v2,
            capacity: effective_capacity,
            genesis,
            path,
        })
    }

    pub fn put(&self, block: &StoredBlock) -> Result<(), BlockStoreError> {
        let hash = block.hash();
        let mut mmap = self.inner.write();

        if let Some(slot) = probe(&mmap, self.capacity, self.version, &hash, &self.cache) {
            let off = slot_offset(slot, self.version);
            let body = encode_body(block, self.version)?;
            mmap[off + 32..off + self.version.record_len()].copy_from_slice(&body);
            self.cache.insert(hash, slot);
            return Ok(());
        }

        let slot = write_record_at_cursor(&mut mmap, self.capacity, self.version, block)?;
        self.cache.insert(hash, slot);
        Ok(())
    }

    pub fn get(&self, hash: &BlockHash) -> Option<StoredBlock> {
        let mmap = self.inner.read();
        let slot = probe(&mmap, self.capacity, self.version, hash, &self.cache)?;
        let off = slot_offset(slot, self.version);
        let body = &mmap[off + 32..off + self.version.record_len()];
        decode_body(body, self.version).ok()
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        let mmap = self.inner.read();
        probe(&mmap, self.capacity, self.version, hash, &self.cache).is_some()
    }

    pub fn get_chain_head(&self) -> StoredBlock {
        let mmap = self.inner.read();
        let head = read_head_hash(&mmap);
        if head.is_zero() {
            return self.genesis.clone();
        }
        drop(mmap);
        // Latent invariant violation (head points at an evicted slot): fall
        // back to genesis rather than surfacing an error from an accessor
        // whose contract is infallible.
        self.get(&head).unwrap_or_else(|| self.genesis.clone())
    }

    pub fn set_chain_head(&self, block: &StoredBlock) {
        let hash = block.hash();
        let mut mmap = self.inner.write();
        write_head_hash(&mut mmap, &hash);
    }

    pub fn clear(&self) -> Result<(), BlockStoreError> {
        let mut mmap = self.inner.write();
        let start = FILE_PROLOGUE_BYTES;
        let end = slot_offset(self.capacity, self.version);
        mmap[start..end].fill(0);
        write_cursor(&mut mmap, FILE_PROLOGUE_BYTES as u32);
        write_head_hash(&mut mmap, &BlockHash::ZERO);
        let genesis = self.genesis.clone();
        let slot = write_record_at_cursor(&mut mmap, self.capacity, self.version, &genesis)?;
        drop(mmap);
        self.cache.clear();
        self.cache.insert(genesis.hash(), slot);
        Ok(())
    }

    pub fn close(self) -> Result<(), BlockStoreError> {
        let mut mmap = self.inner.write();
        mmap.flush()?;
        drop(mmap);
        if let Some(file) = self.lock_file.lock().take() {
            lock::unlock(&file);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn version(&self) -> RecordVersion {
        self.version
    }
}

impl BlockStore for MappedRingStore {
    fn put(&self, block: &StoredBlock) -> Result<(), BlockStoreError> {
        MappedRingStore::put(self, block)
    }

    fn get(&self, hash: &BlockHash) -> Option<StoredBlock> {
        MappedRingStore::get(self, hash)
    }

    fn contains(&self, hash: &BlockHash) -> bool {
        MappedRingStore::contains(self, hash)
    }

    fn get_chain_head(&self) -> StoredBlock {
        MappedRingStore::get_chain_head(self)
    }

    fn set_chain_head(&self, block: &StoredBlock) {
        MappedRingStore::set_chain_head(self, block)
    }

    fn clear(&self) -> Result<(), BlockStoreError> {
        MappedRingStore::clear(self)
    }
}

fn zero_prologue_and_write_magic(mmap: &mut MmapMut, version: RecordVersion) {
    mmap[..].fill(0);
    let magic = magic_for(version);
    mmap[MAGIC_OFFSET..MAGIC_OFFSET + MAGIC_LEN].copy_from_slice(&magic);
    write_cursor(mmap, FILE_PROLOGUE_BYTES as u32);
}

fn read_cursor(mmap: &MmapMut) -> u32 {
    u32::from_le_bytes(mmap[CURSOR_OFFSET..CURSOR_OFFSET + 4].try_into().unwrap())
}

fn write_cursor(mmap: &mut MmapMut, cursor: u32) {
    mmap[CURSOR_OFFSET..CURSOR_OFFSET + 4].copy_from_slice(&cursor.to_le_bytes());
}

fn read_head_hash(mmap: &MmapMut) -> BlockHash {
    let mut out = [0u8; 32];
    out.copy_from_slice(&mmap[HEAD_HASH_OFFSET..HEAD_HASH_OFFSET + HEAD_HASH_LEN]);
    BlockHash(out)
}

fn write_head_hash(mmap: &mut MmapMut, hash: &BlockHash) {
    mmap[HEAD_HASH_OFFSET..HEAD_HASH_OFFSET + HEAD_HASH_LEN].copy_from_slice(&hash.0);
}

/// Open-addressed linear probing. Returns the slot index holding `hash`, if any.
fn probe(
    mmap: &MmapMut,
    capacity: u32,
    version: RecordVersion,
    hash: &BlockHash,
    cache: &ProbeCache,
) -> Option<u32> {
    if let Some(slot) = cache.get(hash) {
        let off = slot_offset(slot, version);
        if &mmap[off..off + 32] == hash.0.as_slice() {
            return Some(slot);
        }
        cache.invalidate(hash);
    }

    let start = hash.probe_seed() % capacity;
    for step in 0..capacity {
        let idx = (start + step) % capacity;
        let off = slot_offset(idx, version);
        let slot_hash = &mmap[off..off + 32];
        if slot_hash == hash.0.as_slice() {
            cache.insert(*hash, idx);
            return Some(idx);
        }
        if slot_hash.iter().all(|&b| b == 0) {
            return None;
        }
    }
    None
}

/// Insert at the ring cursor (FIFO eviction) and advance the cursor.
/// Returns the slot index the record was written to.
fn write_record_at_cursor(
    mmap: &mut MmapMut,
    capacity: u32,
    version: RecordVersion,
    block: &StoredBlock,
) -> Result<u32, BlockStoreError> {
    let cursor = read_cursor(mmap);
    let slot = cursor_to_slot_index(cursor, version);
    let off = slot_offset(slot, version);
    let hash = block_hash(&block.header);
    let body = encode_body(block, version)?;
    mmap[off..off + 32].copy_from_slice(&hash.0);
    mmap[off + 32..off + version.record_len()].copy_from_slice(&body);
    let next_slot = (slot + 1) % capacity;
    write_cursor(mmap, slot_offset(next_slot, version) as u32);
    Ok(slot)
}

fn grow_in_place(
    file: &File,
    mmap: &mut MmapMut,
    old_capacity: u32,
    new_capacity: u32,
    version: RecordVersion,
) -> Result<(), BlockStoreError> {
    let new_size = file_size_for(new_capacity, version);
    mmap.flush()?;
    file.set_len(new_size)?;
    let mut grown = unsafe { MmapMut::map_mut(file)? };
    grown[..file_size_for(old_capacity, version) as usize]
        .copy_from_slice(&mmap[..file_size_for(old_capacity, version) as usize]);
    *mmap = grown;
    Ok(())
}
