use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::element::{ElementKind, SetElement};
use crate::error::{Result, StorageError};
use crate::metadata::IndexMetadata;
use crate::session::WriteSession;
use crate::shard::{SHARD_DIR, Shard, open_shards, shard_of};

pub const LOCK_FILE: &str = "LOCK";

/// Values a write session buffers before it flushes on its own.
pub const DEFAULT_MAX_BUFFERED_VALUES: usize = 1_000_000;

/// Summary of an open index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub key_count: u64,
    pub shard_count: u32,
    /// Sorted run files across all shards; one per shard after compaction.
    pub run_count: usize,
    pub capacity_hint: u64,
    pub element_kind: ElementKind,
}

pub(crate) struct OpenState {
    pub(crate) metadata: IndexMetadata,
    pub(crate) shards: Vec<Shard>,
}

///
/// A durable multimap from byte keys to sets of `V`.
///
/// The store is a directory holding `index.json`, a `LOCK` file and the
/// `shards/` a key is spread over by hash. A handle starts closed; it is
/// opened once, filled through write sessions and then only read from. An
/// open index without a session is `Send + Sync` and serves concurrent lookups
/// from behind an `Arc`.
///
/// # Examples
///
/// ```no_run
/// use varmap_index::KeyValueIndex;
///
/// let mut index: KeyValueIndex<u32> = KeyValueIndex::new("/tmp/gene_changes");
/// index.open(1_000).unwrap();
/// index.add("TP53 R273H", 7).unwrap();
///
/// assert!(index.lookup("TP53 R273H").unwrap().contains(&7));
/// ```
pub struct KeyValueIndex<V: SetElement> {
    pub(crate) root: PathBuf,
    pub(crate) max_buffered_values: usize,
    pub(crate) state: Option<OpenState>,
    element: PhantomData<fn() -> V>,
}

impl<V: SetElement> KeyValueIndex<V> {
    ///
    /// Create a closed handle on the store at `path`. Nothing is touched on disk.
    ///
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        KeyValueIndex {
            root: path.as_ref().to_path_buf(),
            max_buffered_values: DEFAULT_MAX_BUFFERED_VALUES,
            state: None,
            element: PhantomData,
        }
    }

    pub fn with_max_buffered_values(mut self, max_buffered_values: usize) -> Self {
        self.set_max_buffered_values(max_buffered_values);
        self
    }

    /// Bound on the values a write session keeps in memory before flushing.
    pub fn set_max_buffered_values(&mut self, max_buffered_values: usize) {
        self.max_buffered_values = max_buffered_values.max(1);
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    ///
    /// Open the store, creating it when it does not exist yet.
    ///
    /// A new store gets one shard per 2^20 expected entries (1 to 4096). An
    /// existing store keeps the layout it was created with, whatever the hint.
    ///
    /// # Arguments
    /// - capacity_hint: expected number of keys
    pub fn open(&mut self, capacity_hint: u64) -> Result<()> {
        if self.state.is_some() {
            return Err(StorageError::AlreadyOpen(self.root.clone()));
        }

        fs::create_dir_all(self.root.join(SHARD_DIR))?;

        let metadata = match IndexMetadata::load(&self.root)? {
            Some(metadata) => {
                if metadata.element_kind != V::KIND {
                    return Err(StorageError::ElementKindMismatch {
                        expected: V::KIND,
                        found: metadata.element_kind,
                    });
                }
                if metadata.capacity_hint != capacity_hint {
                    log::debug!(
                        "Opening {:?} with its original layout of {} shards",
                        self.root,
                        metadata.shard_count
                    );
                }
                metadata
            }
            None => {
                let metadata = IndexMetadata::new(V::KIND, capacity_hint);
                metadata.save(&self.root)?;
                metadata
            }
        };

        let shards = open_shards(&self.root, metadata.shard_count)?;

        self.state = Some(OpenState { metadata, shards });
        Ok(())
    }

    /// Release the mapped shards. Closing a closed handle does nothing.
    pub fn close(&mut self) {
        self.state = None;
    }

    ///
    /// Destroy the store and leave an empty directory in its place.
    ///
    /// Only valid while closed. Fails with [StorageError::Locked] when another
    /// handle holds a write session on the same store.
    pub fn reset(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Err(StorageError::ResetWhileOpen(self.root.clone()));
        }

        if self.root.exists() {
            let lock = acquire_lock(&self.root)?;
            fs::remove_dir_all(&self.root)?;
            drop(lock);
        }

        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub(crate) fn state(&self) -> Result<&OpenState> {
        self.state
            .as_ref()
            .ok_or_else(|| StorageError::NotOpen(self.root.clone()))
    }

    /// Raw values stored on disk for a key.
    pub(crate) fn lookup_raw(&self, key: &[u8]) -> Result<Vec<&[u8]>> {
        let state = self.state()?;
        let shard = shard_of(key, state.metadata.shard_count) as usize;
        state.shards[shard].get(key)
    }

    ///
    /// Get the set stored under a key. A key that was never added gives an
    /// empty set.
    ///
    pub fn lookup<K: AsRef<[u8]>>(&self, key: K) -> Result<HashSet<V>> {
        self.lookup_raw(key.as_ref())?
            .into_iter()
            .map(V::decode)
            .collect()
    }

    pub fn contains_key<K: AsRef<[u8]>>(&self, key: K) -> Result<bool> {
        Ok(!self.lookup_raw(key.as_ref())?.is_empty())
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let state = self.state()?;
        let mut key_count = 0;
        for shard in &state.shards {
            key_count += shard.key_count()?;
        }

        Ok(IndexStats {
            key_count,
            shard_count: state.metadata.shard_count,
            run_count: state.shards.iter().map(Shard::run_count).sum(),
            capacity_hint: state.metadata.capacity_hint,
            element_kind: state.metadata.element_kind,
        })
    }

    ///
    /// Add one value to the set under a key, in a session of its own.
    ///
    /// Adding a value that is already present changes nothing.
    pub fn add<K: AsRef<[u8]>>(&mut self, key: K, value: V) -> Result<()> {
        let mut session = self.scoped_write_session()?;
        session.add(key, value)?;
        session.finish()
    }

    ///
    /// Merge the runs of every shard into one, in a session of its own.
    ///
    pub fn compact(&mut self) -> Result<()> {
        let mut session = self.scoped_write_session()?;
        session.compact()?;
        session.finish()
    }

    ///
    /// Start a batched write session holding the cross-process write lock.
    ///
    /// The session flushes whatever it buffered when it ends, whether through
    /// [WriteSession::finish] or by being dropped.
    pub fn scoped_write_session(&mut self) -> Result<WriteSession<'_, V>> {
        self.state()?;
        let lock = acquire_lock(&self.root)?;
        Ok(WriteSession::new(self, lock))
    }
}

/// Take the exclusive lock on the store's `LOCK` file without blocking.
fn acquire_lock(root: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(root.join(LOCK_FILE))?;

    FileExt::try_lock_exclusive(&file).map_err(|_| StorageError::Locked(root.to_path_buf()))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    fn open_text_index(dir: &TempDir) -> KeyValueIndex<String> {
        let mut index = KeyValueIndex::new(dir.path().join("genomic"));
        index.open(1_000).unwrap();
        index
    }

    #[rstest]
    fn test_lookup_missing_key_is_empty(dir: TempDir) {
        let index = open_text_index(&dir);
        assert_eq!(index.lookup(b"never added").unwrap(), HashSet::new());
        assert!(!index.contains_key(b"never added").unwrap());
    }

    #[rstest]
    fn test_add_is_idempotent(dir: TempDir) {
        let mut index = open_text_index(&dir);
        index.add(b"k", "-,F,L,1681,12,7,1".to_string()).unwrap();
        index.add(b"k", "-,F,L,1681,12,7,1".to_string()).unwrap();

        let values = index.lookup(b"k").unwrap();
        assert_eq!(values.len(), 1);
        assert!(values.contains("-,F,L,1681,12,7,1"));
        assert_eq!(index.stats().unwrap().key_count, 1);
    }

    #[rstest]
    fn test_add_accumulates_a_set(dir: TempDir) {
        let mut index = open_text_index(&dir);
        index.add(b"k", "a".to_string()).unwrap();
        index.add(b"k", "b".to_string()).unwrap();

        let values = index.lookup(b"k").unwrap();
        assert_eq!(values, HashSet::from(["a".to_string(), "b".to_string()]));
    }

    #[rstest]
    fn test_invalid_element_is_rejected(dir: TempDir) {
        let mut index = open_text_index(&dir);
        let result = index.add(b"k", String::new());
        assert!(matches!(result, Err(StorageError::InvalidElement(_))));
        assert!(!index.contains_key(b"k").unwrap());
    }

    #[rstest]
    fn test_state_machine(dir: TempDir) {
        let mut index: KeyValueIndex<u32> = KeyValueIndex::new(dir.path().join("genes"));

        assert!(matches!(index.lookup(b"k"), Err(StorageError::NotOpen(_))));
        assert!(matches!(index.add(b"k", 1), Err(StorageError::NotOpen(_))));

        index.reset().unwrap();
        index.open(10).unwrap();
        assert!(matches!(index.open(10), Err(StorageError::AlreadyOpen(_))));
        assert!(matches!(index.reset(), Err(StorageError::ResetWhileOpen(_))));

        index.close();
        index.close();
        assert!(!index.is_open());
    }

    #[rstest]
    fn test_values_survive_reopen(dir: TempDir) {
        let path = dir.path().join("genes");
        {
            let mut index: KeyValueIndex<u32> = KeyValueIndex::new(&path);
            index.open(10).unwrap();
            index.add("TP53 R273H", 7).unwrap();
            index.close();
        }

        let mut index: KeyValueIndex<u32> = KeyValueIndex::new(&path);
        index.open(10).unwrap();
        assert_eq!(index.lookup("TP53 R273H").unwrap(), HashSet::from([7]));
    }

    #[rstest]
    fn test_reset_destroys_content(dir: TempDir) {
        let mut index = open_text_index(&dir);
        index.add(b"k", "v".to_string()).unwrap();
        index.close();

        index.reset().unwrap();
        index.open(1_000).unwrap();
        assert!(index.lookup(b"k").unwrap().is_empty());
        assert_eq!(index.stats().unwrap().key_count, 0);
    }

    #[rstest]
    fn test_element_kind_mismatch(dir: TempDir) {
        let path = dir.path().join("store");
        let mut text: KeyValueIndex<String> = KeyValueIndex::new(&path);
        text.open(10).unwrap();
        text.close();

        let mut numbers: KeyValueIndex<u32> = KeyValueIndex::new(&path);
        assert!(matches!(
            numbers.open(10),
            Err(StorageError::ElementKindMismatch {
                expected: ElementKind::U32,
                found: ElementKind::Text
            })
        ));
    }

    #[rstest]
    fn test_layout_is_fixed_at_creation(dir: TempDir) {
        let path = dir.path().join("store");
        let mut index: KeyValueIndex<u32> = KeyValueIndex::new(&path);
        index.open(3 << 20).unwrap();
        assert_eq!(index.stats().unwrap().shard_count, 3);
        index.close();

        index.open(10).unwrap();
        assert_eq!(index.stats().unwrap().shard_count, 3);
    }
}
