use crate::aggregate::aggregate;
use crate::config::{MalformedFieldPolicy, PipelineOptions};
use crate::export::export_json;
use crate::ingest::{BatchIngestor, IngestStats};
use crate::merge::merge_buckets;
use crate::paths::discover_inputs;
use crate::progress::{make_progress_bar_labeled, total_compressed_size};
use crate::record::MergeStats;
use crate::store::{AggregateStore, RawStore};
use crate::util::init_tracing_once;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Three-stage batch run: ingest → aggregate + merge → export.
/// Stores are passed in per call; the pipeline itself only holds options.
#[derive(Clone, Debug, Default)]
pub struct BidWinPipeline {
    pub(crate) opts: PipelineOptions,
}

/// What one full `run` did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ingest: IngestStats,
    pub buckets: u64,
    pub merge: MergeStats,
    pub exported: u64,
}

impl BidWinPipeline {
    pub fn new() -> Self {
        Self { opts: PipelineOptions::default() }
    }

    pub fn with_options(opts: PipelineOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn input_root(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_input_root(dir); self }
    pub fn extensions<I, S>(mut self, exts: I) -> Self where I: IntoIterator<Item = S>, S: AsRef<str> { self.opts = self.opts.with_extensions(exts); self }
    pub fn batch_size(mut self, n: usize) -> Self { self.opts = self.opts.with_batch_size(n); self }
    pub fn malformed_fields(mut self, policy: MalformedFieldPolicy) -> Self { self.opts = self.opts.with_malformed_fields(policy); self }
    pub fn output_path(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output_path(path); self }
    pub fn pretty(mut self, yes: bool) -> Self { self.opts = self.opts.with_pretty(yes); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn io_read_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_io_read_buffer(bytes); self }
    pub fn io_write_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_io_write_buffer(bytes); self }

    // -------- Stages --------

    /// Input units under `input_root` matching `extensions`, sorted.
    pub fn discover_inputs(&self) -> Vec<PathBuf> {
        discover_inputs(&self.opts.input_root, &self.opts.extensions)
    }

    /// Ingest every discovered unit, one after another, into `raw`.
    pub fn ingest_all<R: RawStore + ?Sized>(&self, raw: &R) -> Result<IngestStats> {
        init_tracing_once();
        let files = self.discover_inputs();
        if files.is_empty() {
            tracing::warn!(root = %self.opts.input_root.display(), "No input units found. Check input_root and extensions.");
        } else {
            tracing::info!("Planned {} input units for ingestion.", files.len());
        }
        self.ingest_files(&files, raw)
    }

    /// Ingest an explicit list of units (no discovery).
    pub fn ingest_files<R: RawStore + ?Sized>(&self, files: &[PathBuf], raw: &R) -> Result<IngestStats> {
        init_tracing_once();
        let ingestor = BatchIngestor::new(raw, self.opts.batch_size, self.opts.malformed_fields);
        let pb = if self.opts.progress {
            let label = self.opts.progress_label.as_deref().unwrap_or("Ingest");
            Some(make_progress_bar_labeled(total_compressed_size(files), Some(label)))
        } else {
            None
        };

        let mut total = IngestStats::default();
        for path in files {
            let stats = ingestor
                .ingest_path(path, self.opts.read_buffer_bytes, |delta| {
                    if let Some(pb) = &pb { pb.inc(delta); }
                })
                .with_context(|| format!("ingesting {}", path.display()))?;
            total += stats;
        }

        if let Some(pb) = pb { pb.finish_with_message("ingest done"); }
        tracing::info!(
            units = total.units,
            records = total.records,
            skipped = total.skipped(),
            batches = total.batches,
            "ingest stage complete"
        );
        Ok(total)
    }

    /// Recompute all buckets from `raw` and upsert them into `agg`.
    /// Safe to repeat: an unchanged raw store yields an unchanged aggregate store.
    pub fn aggregate_and_merge<R, A>(&self, raw: &R, agg: &A) -> Result<(u64, MergeStats)>
    where
        R: RawStore + ?Sized,
        A: AggregateStore + ?Sized,
    {
        init_tracing_once();
        let buckets = aggregate(raw).context("aggregate stage")?;
        let n = buckets.len() as u64;
        let stats = merge_buckets(buckets, agg).context("merge stage")?;
        Ok((n, stats))
    }

    /// Write the aggregate store to `output_path` as one JSON array.
    pub fn export<A: AggregateStore + ?Sized>(&self, agg: &A) -> Result<u64> {
        init_tracing_once();
        export_json(agg, &self.opts.output_path, self.opts.pretty, self.opts.write_buffer_bytes)
            .with_context(|| format!("export stage ({})", self.opts.output_path.display()))
    }

    /// Full run: ingest all inputs, aggregate + merge, export.
    pub fn run<R, A>(&self, raw: &R, agg: &A) -> Result<RunSummary>
    where
        R: RawStore + ?Sized,
        A: AggregateStore + ?Sized,
    {
        let ingest = self.ingest_all(raw).context("ingest stage")?;
        let (buckets, merge) = self.aggregate_and_merge(raw, agg)?;
        let exported = self.export(agg)?;
        Ok(RunSummary { ingest, buckets, merge, exported })
    }
}
