//! Full-recompute grouping over the raw store.
//! One bucket per distinct `GroupKey`; sum/min/max/count over `price`.

use crate::record::{AggregateBucket, BucketValues, GroupKey, NormalizedWinRecord};
use crate::store::RawStore;
use ahash::RandomState;
use anyhow::{Context, Result};
use std::collections::HashMap;

/// Running reduction for one key. `merge` lets partial aggregates be combined.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BucketStats {
    sum: f64,
    min: f64,
    max: f64,
    count: u64,
}

impl Default for BucketStats {
    fn default() -> Self {
        Self { sum: 0.0, min: f64::INFINITY, max: f64::NEG_INFINITY, count: 0 }
    }
}

impl BucketStats {
    pub fn ingest(&mut self, price: f64) {
        self.sum += price;
        self.min = self.min.min(price);
        self.max = self.max.max(price);
        self.count += 1;
    }

    pub fn merge(&mut self, other: Self) {
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count += other.count;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Only meaningful once at least one price was ingested.
    pub fn values(&self) -> BucketValues {
        BucketValues {
            total_price: self.sum,
            min_price: self.min,
            max_price: self.max,
            total_count: self.count,
        }
    }
}

/// Group accumulator keyed by the exact 5-tuple.
#[derive(Default)]
pub struct Grouping {
    groups: HashMap<GroupKey, BucketStats, RandomState>,
}

impl Grouping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, rec: &NormalizedWinRecord) {
        self.groups.entry(rec.group_key()).or_default().ingest(rec.price);
    }

    pub fn merge(&mut self, other: Self) {
        for (k, v) in other.groups {
            self.groups.entry(k).or_default().merge(v);
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Emit buckets sorted by key. Buckets whose sum overflowed are dropped.
    pub fn into_buckets(self) -> Vec<AggregateBucket> {
        let mut out: Vec<AggregateBucket> = self
            .groups
            .into_iter()
            .filter(|(_, s)| s.count() > 0)
            .map(|(key, s)| AggregateBucket { key, values: s.values() })
            .filter(|b| {
                let ok = b.values.is_finite();
                if !ok {
                    tracing::warn!(key = ?b.key, total_price = b.values.total_price, "dropping bucket with non-finite totals");
                }
                ok
            })
            .collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }
}

/// Scan the whole raw store once and reduce it to buckets.
/// Pure in the store's contents: no state carries over between calls.
pub fn aggregate<S: RawStore + ?Sized>(raw: &S) -> Result<Vec<AggregateBucket>> {
    let mut grouping = Grouping::new();
    let mut scanned = 0u64;
    raw.for_each_record(&mut |rec: NormalizedWinRecord| {
        grouping.ingest(&rec);
        scanned += 1;
        Ok(())
    })
    .context("scan raw store")?;
    tracing::info!(records = scanned, buckets = grouping.len(), "aggregated raw store");
    Ok(grouping.into_buckets())
}
