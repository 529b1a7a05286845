use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::element::ElementKind;
use crate::error::{Result, StorageError};

pub const METADATA_FILE: &str = "index.json";
pub const FORMAT_VERSION: u32 = 2;

/// Entries per shard the capacity hint is divided by.
pub const ENTRIES_PER_SHARD: u64 = 1 << 20;
pub const MAX_SHARDS: u32 = 4096;

/// Name of the key hash, kept in the metadata so a store is never read with another one.
const KEY_HASH: &str = "fxhash64";

/// Metadata of an index, serialized to `index.json` at the root of the store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndexMetadata {
    /// Version of the on-disk format
    pub version: u32,
    /// Type of the set elements
    pub element_kind: ElementKind,
    /// Number of shards keys are spread over, fixed at creation
    pub shard_count: u32,
    /// Capacity hint the store was created with
    pub capacity_hint: u64,
    /// Hash used to pick the shard of a key
    pub key_hash: String,
    /// Creation timestamp
    pub created_at: String,
}

///
/// Number of shards for a capacity hint: one per [ENTRIES_PER_SHARD] entries,
/// at least one and at most [MAX_SHARDS].
///
pub fn shard_count_for(capacity_hint: u64) -> u32 {
    let shards = capacity_hint.div_ceil(ENTRIES_PER_SHARD);
    shards.clamp(1, MAX_SHARDS as u64) as u32
}

impl IndexMetadata {
    pub fn new(element_kind: ElementKind, capacity_hint: u64) -> Self {
        IndexMetadata {
            version: FORMAT_VERSION,
            element_kind,
            shard_count: shard_count_for(capacity_hint),
            capacity_hint,
            key_hash: KEY_HASH.to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn load(root: &Path) -> Result<Option<Self>> {
        let path = root.join(METADATA_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)?;
        let metadata: IndexMetadata = serde_json::from_str(&json)
            .map_err(|e| StorageError::Metadata(format!("Failed to parse {:?}: {}", path, e)))?;

        if metadata.version != FORMAT_VERSION {
            return Err(StorageError::Metadata(format!(
                "Unsupported format version {} (expected {})",
                metadata.version, FORMAT_VERSION
            )));
        }
        if metadata.key_hash != KEY_HASH {
            return Err(StorageError::Metadata(format!(
                "Unsupported key hash '{}'",
                metadata.key_hash
            )));
        }
        if metadata.shard_count == 0 || metadata.shard_count > MAX_SHARDS {
            return Err(StorageError::Metadata(format!(
                "Invalid shard count {}",
                metadata.shard_count
            )));
        }

        Ok(Some(metadata))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StorageError::Metadata(format!("Failed to serialize metadata: {}", e)))?;
        fs::write(root.join(METADATA_FILE), json)?;
        Ok(())
    }
}
