//! File-backed stores: one NDJSON file per collection under a store directory.
//!
//! Layout:
//!   <dir>/raw.ndjson          append-only normalized wins
//!   <dir>/aggregates.ndjson   keyed buckets, rewritten atomically per bulk upsert

use crate::ndjson::{NdjsonReader, NdjsonWriter};
use crate::record::{AggregateBucket, BucketValues, GroupKey, MergeStats, NormalizedWinRecord, UpsertOp};
use crate::store::{apply_upserts, buckets_from_map, AggregateStore, RawStore};
use crate::util::{remove_with_backoff, staging_path};
use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const IO_BUF: usize = 256 * 1024;

pub struct NdjsonRawStore {
    path: PathBuf,
    // serializes appends from handles shared across threads
    lock: Mutex<()>,
}

impl NdjsonRawStore {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("create store dir {}", dir.display()))?;
        Ok(Self { path: dir.join("raw.ndjson"), lock: Mutex::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RawStore for NdjsonRawStore {
    fn insert_many(&self, docs: &[NormalizedWinRecord]) -> Result<()> {
        let _g = self.lock.lock();
        let mut w = NdjsonWriter::append(&self.path, IO_BUF)
            .with_context(|| format!("open {} for append", self.path.display()))?;
        for doc in docs {
            w.write_doc(doc)?;
        }
        w.finish()
    }

    fn for_each_record(&self, f: &mut dyn FnMut(NormalizedWinRecord) -> Result<()>) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut r = NdjsonReader::open(&self.path, IO_BUF)
            .with_context(|| format!("open {}", self.path.display()))?;
        while let Some(doc) = r.next_doc::<NormalizedWinRecord>()? {
            f(doc)?;
        }
        Ok(())
    }

    fn count(&self) -> Result<u64> {
        let mut n = 0u64;
        self.for_each_record(&mut |_: NormalizedWinRecord| {
            n += 1;
            Ok(())
        })?;
        Ok(n)
    }

    fn clear(&self) -> Result<()> {
        let _g = self.lock.lock();
        remove_with_backoff(&self.path, 16, 50)
    }
}

pub struct NdjsonAggregateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl NdjsonAggregateStore {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("create store dir {}", dir.display()))?;
        Ok(Self { path: dir.join("aggregates.ndjson"), lock: Mutex::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<GroupKey, BucketValues>> {
        let mut map = BTreeMap::new();
        if !self.path.exists() {
            return Ok(map);
        }
        let mut r = NdjsonReader::open(&self.path, IO_BUF)
            .with_context(|| format!("open {}", self.path.display()))?;
        while let Some(b) = r.next_doc::<AggregateBucket>()? {
            map.insert(b.key, b.values);
        }
        Ok(map)
    }
}

impl AggregateStore for NdjsonAggregateStore {
    fn bulk_upsert(&self, ops: &[UpsertOp]) -> Result<MergeStats> {
        if let Some(op) = ops.iter().find(|op| !op.set.is_finite()) {
            bail!("non-finite aggregate values for {:?}", op.filter);
        }
        let _g = self.lock.lock();
        let mut map = self.load()?;
        let stats = apply_upserts(&mut map, ops);

        let tmp = staging_path(&self.path);
        let mut w = NdjsonWriter::create(&tmp, IO_BUF).with_context(|| format!("create {}", tmp.display()))?;
        for bucket in buckets_from_map(&map) {
            w.write_doc(&bucket)?;
        }
        w.finish_atomic(&self.path)?;
        Ok(stats)
    }

    fn find_all(&self) -> Result<Vec<AggregateBucket>> {
        let _g = self.lock.lock();
        Ok(buckets_from_map(&self.load()?))
    }

    fn count(&self) -> Result<u64> {
        let _g = self.lock.lock();
        Ok(self.load()?.len() as u64)
    }
}
