//! Upsert freshly computed buckets into the aggregate store, keyed by `GroupKey`.

use crate::record::{AggregateBucket, MergeStats, UpsertOp};
use crate::store::AggregateStore;
use anyhow::{Context, Result};

/// Submit one upsert per bucket in a single bulk request.
/// No buckets → no request at all.
pub fn merge_buckets<S: AggregateStore + ?Sized>(buckets: Vec<AggregateBucket>, agg: &S) -> Result<MergeStats> {
    if buckets.is_empty() {
        tracing::info!("no aggregate buckets; skipping bulk upsert");
        return Ok(MergeStats::default());
    }
    let ops: Vec<UpsertOp> = buckets.into_iter().map(UpsertOp::from).collect();
    let stats = agg
        .bulk_upsert(&ops)
        .with_context(|| format!("bulk upsert of {} buckets", ops.len()))?;
    tracing::info!(matched = stats.matched, inserted = stats.inserted, "merged aggregate buckets");
    Ok(stats)
}
