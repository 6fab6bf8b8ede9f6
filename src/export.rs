//! Dump the aggregate store as one JSON array.

use crate::store::AggregateStore;
use crate::util::{create_with_backoff, replace_file_atomic_backoff, staging_path};
use anyhow::{Context, Result};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write every aggregate record to `out_path` as a JSON array, replacing any
/// previous file. Returns the number of records written; an empty store gives `[]`.
pub fn export_json<S: AggregateStore + ?Sized>(
    agg: &S,
    out_path: &Path,
    pretty: bool,
    write_buf: usize,
) -> Result<u64> {
    let buckets = agg.find_all().context("read aggregate store")?;

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let tmp = staging_path(out_path);
    let file = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
    let mut w = BufWriter::with_capacity(write_buf.max(8 * 1024), file);
    if pretty {
        serde_json::to_writer_pretty(&mut w, &buckets)?;
    } else {
        serde_json::to_writer(&mut w, &buckets)?;
    }
    w.flush().with_context(|| format!("flush {}", tmp.display()))?;
    drop(w);
    replace_file_atomic_backoff(&tmp, out_path)?;

    tracing::info!(path = %out_path.display(), records = buckets.len(), "exported aggregates");
    Ok(buckets.len() as u64)
}
