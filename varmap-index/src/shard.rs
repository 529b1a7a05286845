//! Shards and their sorted runs.
//!
//! A shard is the set of immutable run files under `shards/` named
//! `<shard>-<seq>.vmk`. A flush writes the buffered entries of a shard as one
//! new run; runs are never modified in place. Each run is laid out as:
//!
//! ```text
//! entries   [key_len u32][key][n u32]([len u32][value]){n}   sorted by key
//! offsets   [entry offset u64]{count}
//! footer    [offsets_start u64][count u64][magic 8 bytes]
//! ```
//!
//! All integers are little-endian. A key may appear in several runs of a
//! shard; its set is the union over them. Runs are merged in the manner of a
//! binary counter: the newest run is merged into its predecessor as long as
//! it is at least as large, which keeps the run count logarithmic in the
//! number of flushes and never rewrites a large run for a small batch.
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use memmap2::Mmap;

use crate::error::{Result, StorageError};

pub const SHARD_DIR: &str = "shards";

const RUN_EXTENSION: &str = "vmk";
const MAGIC: &[u8; 8] = b"VMKSHRD2";
const FOOTER_LEN: usize = 8 + 8 + MAGIC.len();

/// Runs a shard may hold before all of them are merged into one.
pub const MAX_RUNS: usize = 32;

/// A sorted entry as it goes into a run: key and its (sorted) values.
pub type RunEntry<K, V> = (K, Vec<V>);

pub fn run_path(root: &Path, shard: u32, seq: u64) -> PathBuf {
    root.join(SHARD_DIR)
        .join(format!("{:04}-{:08}.{}", shard, seq, RUN_EXTENSION))
}

/// Shard and sequence number of a run file name, `None` for anything else.
fn parse_run_name(name: &str) -> Option<(u32, u64)> {
    let stem = name.strip_suffix(RUN_EXTENSION)?.strip_suffix('.')?;
    let (shard, seq) = stem.split_once('-')?;
    Some((shard.parse().ok()?, seq.parse().ok()?))
}

/// Pick the shard of a key.
pub fn shard_of(key: &[u8], shard_count: u32) -> u32 {
    (fxhash::hash64(key) % shard_count as u64) as u32
}

fn len_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| StorageError::InvalidElement(format!("{} is too long: {} bytes", what, len)))
}

/// A memory-mapped run file.
pub struct Run {
    path: PathBuf,
    map: Mmap,
    offsets_start: usize,
    count: usize,
}

impl Run {
    ///
    /// Map a run file and validate its footer.
    ///
    pub fn open(path: &Path) -> Result<Run> {
        let file = File::open(path)?;

        if file.metadata()?.len() < FOOTER_LEN as u64 {
            return Err(StorageError::Corrupted {
                path: path.to_path_buf(),
                reason: "file is shorter than its footer".to_string(),
            });
        }

        // SAFETY: run files are moved into place by rename and never written in place
        let map = unsafe { Mmap::map(&file)? };

        let mut run = Run {
            path: path.to_path_buf(),
            map,
            offsets_start: 0,
            count: 0,
        };

        let len = run.map.len();

        let footer = &run.map[len - FOOTER_LEN..];
        if &footer[16..] != MAGIC {
            return Err(run.corrupted("bad magic"));
        }

        let offsets_start = LittleEndian::read_u64(&footer[0..8]) as usize;
        let count = LittleEndian::read_u64(&footer[8..16]) as usize;

        // offsets table sits right before the footer
        let table_end = count
            .checked_mul(8)
            .and_then(|table_len| offsets_start.checked_add(table_len));
        if table_end != Some(len - FOOTER_LEN) {
            return Err(run.corrupted("offsets table does not line up with the footer"));
        }

        run.offsets_start = offsets_start;
        run.count = count;
        Ok(run)
    }

    fn corrupted(&self, reason: &str) -> StorageError {
        StorageError::Corrupted {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    /// Number of keys in the run.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Size of the run file in bytes.
    pub fn size(&self) -> usize {
        self.map.len()
    }

    /// Bytes `[at, at + len)` of the entry region.
    fn slice(&self, at: usize, len: usize) -> Result<&[u8]> {
        at.checked_add(len)
            .filter(|end| *end <= self.offsets_start)
            .map(|end| &self.map[at..end])
            .ok_or_else(|| self.corrupted("entry runs past the entry region"))
    }

    fn read_u32(&self, at: usize) -> Result<(u32, usize)> {
        let bytes = self.slice(at, 4)?;
        Ok((LittleEndian::read_u32(bytes), at + 4))
    }

    fn entry_offset(&self, idx: usize) -> usize {
        let at = self.offsets_start + idx * 8;
        LittleEndian::read_u64(&self.map[at..at + 8]) as usize
    }

    /// Key of the entry `idx` and the offset of its value block.
    fn key_at(&self, idx: usize) -> Result<(&[u8], usize)> {
        let (key_len, at) = self.read_u32(self.entry_offset(idx))?;
        let key = self.slice(at, key_len as usize)?;
        Ok((key, at + key_len as usize))
    }

    fn values_at(&self, at: usize) -> Result<Vec<&[u8]>> {
        let (n, mut at) = self.read_u32(at)?;
        let mut values = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let (len, next) = self.read_u32(at)?;
            values.push(self.slice(next, len as usize)?);
            at = next + len as usize;
        }
        Ok(values)
    }

    ///
    /// Binary search for a key.
    ///
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<&[u8]>>> {
        let mut a = 0;
        let mut b = self.count;

        while a < b {
            let pivot = a + (b - a) / 2;
            let (candidate, values_at) = self.key_at(pivot)?;
            match candidate.cmp(key) {
                std::cmp::Ordering::Less => a = pivot + 1,
                std::cmp::Ordering::Greater => b = pivot,
                std::cmp::Ordering::Equal => return Ok(Some(self.values_at(values_at)?)),
            }
        }
        Ok(None)
    }
}

///
/// Streams the entries of several runs in key order, merging the value sets
/// of keys found in more than one run.
///
pub struct MergedEntries<'r> {
    runs: &'r [Run],
    cursors: Vec<usize>,
    failed: bool,
}

impl<'r> MergedEntries<'r> {
    pub fn new(runs: &'r [Run]) -> Self {
        MergedEntries {
            runs,
            cursors: vec![0; runs.len()],
            failed: false,
        }
    }

    fn next_entry(&mut self) -> Result<Option<RunEntry<&'r [u8], &'r [u8]>>> {
        let runs = self.runs;
        let mut smallest: Option<&'r [u8]> = None;
        for (run, cursor) in runs.iter().zip(&self.cursors) {
            if *cursor < run.len() {
                let (key, _) = run.key_at(*cursor)?;
                if smallest.is_none_or(|s| key < s) {
                    smallest = Some(key);
                }
            }
        }
        let Some(key) = smallest else {
            return Ok(None);
        };

        let mut values = BTreeSet::new();
        for (run, cursor) in runs.iter().zip(self.cursors.iter_mut()) {
            if *cursor < run.len() {
                let (candidate, values_at) = run.key_at(*cursor)?;
                if candidate == key {
                    values.extend(run.values_at(values_at)?);
                    *cursor += 1;
                }
            }
        }
        Ok(Some((key, values.into_iter().collect())))
    }
}

impl<'r> Iterator for MergedEntries<'r> {
    type Item = Result<RunEntry<&'r [u8], &'r [u8]>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_entry() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

///
/// Write a run next to `path` and move it into place.
///
/// Entries must come sorted by key with distinct keys.
///
/// # Returns
/// The number of entries written.
pub fn write_run<K, V, I>(path: &Path, entries: I) -> Result<u64>
where
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
    I: IntoIterator<Item = Result<RunEntry<K, V>>>,
{
    let tmp_path = path.with_extension(format!("{}.tmp", RUN_EXTENSION));

    let file = File::create(&tmp_path)?;
    let mut writer = BufWriter::new(file);

    let mut offsets = Vec::new();
    let mut at: u64 = 0;

    for entry in entries {
        let (key, values) = entry?;
        let key = key.as_ref();
        offsets.push(at);

        writer.write_u32::<LittleEndian>(len_u32(key.len(), "key")?)?;
        writer.write_all(key)?;
        writer.write_u32::<LittleEndian>(len_u32(values.len(), "value set")?)?;
        at += 8 + key.len() as u64;

        for value in &values {
            let value = value.as_ref();
            writer.write_u32::<LittleEndian>(len_u32(value.len(), "value")?)?;
            writer.write_all(value)?;
            at += 4 + value.len() as u64;
        }
    }

    for offset in &offsets {
        writer.write_u64::<LittleEndian>(*offset)?;
    }
    writer.write_u64::<LittleEndian>(at)?;
    writer.write_u64::<LittleEndian>(offsets.len() as u64)?;
    writer.write_all(MAGIC)?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(offsets.len() as u64)
}

/// The runs of one shard, oldest first.
pub struct Shard {
    id: u32,
    runs: Vec<Run>,
    next_seq: u64,
}

impl Shard {
    pub fn new(id: u32) -> Self {
        Shard {
            id,
            runs: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Values under a key across all runs. Empty when the key is absent.
    pub fn get(&self, key: &[u8]) -> Result<Vec<&[u8]>> {
        let mut values = Vec::new();
        for run in &self.runs {
            if let Some(found) = run.get(key)? {
                values.extend(found);
            }
        }
        Ok(values)
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> Result<u64> {
        match self.runs.as_slice() {
            [] => Ok(0),
            [run] => Ok(run.len() as u64),
            runs => {
                let mut count = 0;
                for entry in MergedEntries::new(runs) {
                    entry?;
                    count += 1;
                }
                Ok(count)
            }
        }
    }

    ///
    /// Write sorted entries as a new run, then merge runs as needed.
    ///
    pub fn append<K, V, I>(&mut self, root: &Path, entries: I) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
        I: IntoIterator<Item = Result<RunEntry<K, V>>>,
    {
        let path = run_path(root, self.id, self.next_seq);
        write_run(&path, entries)?;
        self.next_seq += 1;
        self.runs.push(Run::open(&path)?);

        loop {
            let n = self.runs.len();
            if n > MAX_RUNS {
                self.merge_from(root, 0)?;
            } else if n >= 2 && self.runs[n - 1].size() >= self.runs[n - 2].size() {
                self.merge_from(root, n - 2)?;
            } else {
                return Ok(());
            }
        }
    }

    /// Merge every run into one.
    pub fn compact(&mut self, root: &Path) -> Result<()> {
        if self.runs.len() > 1 {
            self.merge_from(root, 0)?;
        }
        Ok(())
    }

    /// Replace the runs `from..` with their merge.
    fn merge_from(&mut self, root: &Path, from: usize) -> Result<()> {
        let path = run_path(root, self.id, self.next_seq);
        write_run(&path, MergedEntries::new(&self.runs[from..]))?;
        self.next_seq += 1;

        let merged = Run::open(&path)?;
        let replaced: Vec<Run> = self.runs.drain(from..).collect();
        self.runs.push(merged);

        // leftovers only duplicate what the merged run holds
        for run in replaced {
            let path = run.path.clone();
            drop(run);
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("Failed to remove merged run {:?}: {}", path, e);
            }
        }
        Ok(())
    }
}

///
/// Map every run of a store into its shard.
///
/// Files that are not runs, such as temporaries left by an interrupted
/// write, are ignored.
pub fn open_shards(root: &Path, shard_count: u32) -> Result<Vec<Shard>> {
    let mut shards: Vec<Shard> = (0..shard_count).map(Shard::new).collect();

    let mut found = Vec::new();
    for entry in fs::read_dir(root.join(SHARD_DIR))? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some((shard, seq)) = parse_run_name(&name.to_string_lossy()) {
            found.push((shard, seq, entry.path()));
        }
    }
    found.sort_unstable();

    for (shard, seq, path) in found {
        let Some(slot) = shards.get_mut(shard as usize) else {
            return Err(StorageError::Corrupted {
                path,
                reason: format!("run of shard {} in a store of {} shards", shard, shard_count),
            });
        };
        slot.runs.push(Run::open(&path)?);
        slot.next_seq = seq + 1;
    }
    Ok(shards)
}
