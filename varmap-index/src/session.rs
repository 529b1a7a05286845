use std::collections::{BTreeMap, HashSet};
use std::fs::File;

use fs2::FileExt;
use fxhash::{FxHashMap, FxHashSet};

use crate::element::SetElement;
use crate::error::{Result, StorageError};
use crate::index::KeyValueIndex;
use crate::shard::shard_of;

///
/// A batched write session on an open [KeyValueIndex].
///
/// Adds go to an in-memory buffer. The buffer is written out as sorted runs
/// on [WriteSession::flush_cache], whenever it grows past the index's
/// `max_buffered_values`, and when the session ends. A session that is
/// dropped without [WriteSession::finish] still flushes, and logs what it
/// could not write.
///
/// The session holds the exclusive lock of the store until it ends.
pub struct WriteSession<'a, V: SetElement> {
    index: &'a mut KeyValueIndex<V>,
    lock: File,
    buffer: FxHashMap<Vec<u8>, FxHashSet<Vec<u8>>>,
    buffered_values: usize,
    finished: bool,
}

impl<'a, V: SetElement> WriteSession<'a, V> {
    pub(crate) fn new(index: &'a mut KeyValueIndex<V>, lock: File) -> Self {
        WriteSession {
            index,
            lock,
            buffer: FxHashMap::default(),
            buffered_values: 0,
            finished: false,
        }
    }

    pub fn buffered_values(&self) -> usize {
        self.buffered_values
    }

    pub fn add<K: AsRef<[u8]>>(&mut self, key: K, value: V) -> Result<()> {
        let value = value.encode()?;
        let key = key.as_ref();

        let inserted = match self.buffer.get_mut(key) {
            Some(values) => values.insert(value),
            None => {
                let mut values = FxHashSet::default();
                values.insert(value);
                self.buffer.insert(key.to_vec(), values);
                true
            }
        };

        if inserted {
            self.buffered_values += 1;
        }
        if self.buffered_values > self.index.max_buffered_values {
            self.flush_cache()?;
        }
        Ok(())
    }

    ///
    /// Write the buffer out as one new sorted run per touched shard.
    ///
    /// A flush costs what it carries: existing runs are only rewritten when
    /// the run merging of a shard asks for it. A shard's values leave the
    /// buffer once its run is in place, so after a failed flush the buffer
    /// still holds everything that was not written.
    pub fn flush_cache(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let root = self.index.root.clone();
        let state = self
            .index
            .state
            .as_mut()
            .ok_or_else(|| StorageError::NotOpen(root.clone()))?;
        let shard_count = state.metadata.shard_count;

        let mut by_shard: BTreeMap<u32, Vec<Vec<u8>>> = BTreeMap::new();
        for key in self.buffer.keys() {
            by_shard
                .entry(shard_of(key, shard_count))
                .or_default()
                .push(key.clone());
        }
        let flushed = self.buffered_values;

        for (shard, mut keys) in by_shard {
            keys.sort_unstable();

            let buffer = &self.buffer;
            let batch = keys.iter().filter_map(|key| {
                let mut values: Vec<&[u8]> = buffer.get(key)?.iter().map(Vec::as_slice).collect();
                values.sort_unstable();
                Some(Ok((key.as_slice(), values)))
            });
            state.shards[shard as usize].append(&root, batch)?;

            for key in &keys {
                if let Some(values) = self.buffer.remove(key) {
                    self.buffered_values = self.buffered_values.saturating_sub(values.len());
                }
            }
        }

        log::debug!("Flushed {} values into {:?}", flushed, root);
        Ok(())
    }

    ///
    /// Flush, then merge the runs of every shard into one.
    ///
    pub fn compact(&mut self) -> Result<()> {
        self.flush_cache()?;

        let root = self.index.root.clone();
        let state = self
            .index
            .state
            .as_mut()
            .ok_or_else(|| StorageError::NotOpen(root.clone()))?;
        for shard in state.shards.iter_mut() {
            shard.compact(&root)?;
        }

        log::debug!("Compacted {:?}", root);
        Ok(())
    }

    /// Values under a key, from the shards and the unflushed buffer.
    pub fn lookup<K: AsRef<[u8]>>(&self, key: K) -> Result<HashSet<V>> {
        let key = key.as_ref();
        let mut found = self.index.lookup(key)?;

        if let Some(values) = self.buffer.get(key) {
            for value in values {
                found.insert(V::decode(value)?);
            }
        }
        Ok(found)
    }

    /// Flush and end the session, releasing the write lock.
    pub fn finish(mut self) -> Result<()> {
        self.flush_cache()?;
        self.finished = true;
        Ok(())
    }
}

impl<V: SetElement> Drop for WriteSession<'_, V> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.flush_cache() {
                log::error!(
                    "Failed to flush write session of {:?}: {}",
                    self.index.root,
                    e
                );
            }
        }
        if let Err(e) = FileExt::unlock(&self.lock) {
            log::warn!("Failed to release the lock of {:?}: {}", self.index.root, e);
        }
    }
}
