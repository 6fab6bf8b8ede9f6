//! Document-store seams. The pipeline only ever talks to these traits, so any
//! backend (in-memory, NDJSON files, a real database) can be injected.
//!
//! Methods take `&self`: a store value behaves like a collection handle.

use crate::record::{AggregateBucket, BucketValues, GroupKey, MergeStats, NormalizedWinRecord, UpsertOp};
use anyhow::Result;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Append-only collection of normalized wins.
pub trait RawStore {
    /// Persist one batch. Called once per flush by the ingestor.
    fn insert_many(&self, docs: &[NormalizedWinRecord]) -> Result<()>;

    /// Visit every stored record once, in storage order.
    fn for_each_record(&self, f: &mut dyn FnMut(NormalizedWinRecord) -> Result<()>) -> Result<()>;

    fn count(&self) -> Result<u64>;

    /// Drop everything, e.g. before re-ingesting inputs that were already loaded.
    fn clear(&self) -> Result<()>;
}

/// Keyed collection of aggregate buckets.
pub trait AggregateStore {
    /// Apply all ops as one request: overwrite the values of matching keys,
    /// insert the rest. Not atomic as a whole.
    fn bulk_upsert(&self, ops: &[UpsertOp]) -> Result<MergeStats>;

    /// Every stored bucket, ordered by key.
    fn find_all(&self) -> Result<Vec<AggregateBucket>>;

    fn count(&self) -> Result<u64>;
}

/// Apply `ops` to a keyed map, counting matches vs inserts.
pub(crate) fn apply_upserts(map: &mut BTreeMap<GroupKey, BucketValues>, ops: &[UpsertOp]) -> MergeStats {
    let mut stats = MergeStats::default();
    for op in ops {
        match map.insert(op.filter.clone(), op.set) {
            Some(_) => stats.matched += 1,
            None => stats.inserted += 1,
        }
    }
    stats
}

pub(crate) fn buckets_from_map(map: &BTreeMap<GroupKey, BucketValues>) -> Vec<AggregateBucket> {
    map.iter()
        .map(|(k, v)| AggregateBucket { key: k.clone(), values: *v })
        .collect()
}

// ----------------------------- In-memory ------------------------------------

/// Vec-backed raw store. Remembers the size of each `insert_many` call.
#[derive(Default)]
pub struct MemoryRawStore {
    inner: Mutex<MemoryRaw>,
}

#[derive(Default)]
struct MemoryRaw {
    docs: Vec<NormalizedWinRecord>,
    calls: Vec<usize>,
}

impl MemoryRawStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch sizes seen by `insert_many`, in call order.
    pub fn insert_calls(&self) -> Vec<usize> {
        self.inner.lock().calls.clone()
    }

    pub fn snapshot(&self) -> Vec<NormalizedWinRecord> {
        self.inner.lock().docs.clone()
    }
}

impl RawStore for MemoryRawStore {
    fn insert_many(&self, docs: &[NormalizedWinRecord]) -> Result<()> {
        let mut g = self.inner.lock();
        g.docs.extend_from_slice(docs);
        g.calls.push(docs.len());
        Ok(())
    }

    fn for_each_record(&self, f: &mut dyn FnMut(NormalizedWinRecord) -> Result<()>) -> Result<()> {
        // Snapshot so the callback may touch the store without deadlocking.
        for doc in self.snapshot() {
            f(doc)?;
        }
        Ok(())
    }

    fn count(&self) -> Result<u64> {
        Ok(self.inner.lock().docs.len() as u64)
    }

    fn clear(&self) -> Result<()> {
        let mut g = self.inner.lock();
        g.docs.clear();
        g.calls.clear();
        Ok(())
    }
}

/// BTreeMap-backed aggregate store keyed by `GroupKey`.
#[derive(Default)]
pub struct MemoryAggregateStore {
    map: Mutex<BTreeMap<GroupKey, BucketValues>>,
    bulk_calls: Mutex<u64>,
}

impl MemoryAggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `bulk_upsert` requests received.
    pub fn bulk_calls(&self) -> u64 {
        *self.bulk_calls.lock()
    }

    pub fn get(&self, key: &GroupKey) -> Option<BucketValues> {
        self.map.lock().get(key).copied()
    }
}

impl AggregateStore for MemoryAggregateStore {
    fn bulk_upsert(&self, ops: &[UpsertOp]) -> Result<MergeStats> {
        *self.bulk_calls.lock() += 1;
        Ok(apply_upserts(&mut self.map.lock(), ops))
    }

    fn find_all(&self) -> Result<Vec<AggregateBucket>> {
        Ok(buckets_from_map(&self.map.lock()))
    }

    fn count(&self) -> Result<u64> {
        Ok(self.map.lock().len() as u64)
    }
}
