//! Batched ingestion of one input unit into a `RawStore`.

use crate::compressed_jsonl::{for_each_line, for_each_line_in_file};
use crate::config::MalformedFieldPolicy;
use crate::normalize::{normalize_line, LineOutcome, SkipReason};
use crate::record::NormalizedWinRecord;
use crate::store::RawStore;
use anyhow::{Context, Result};
use std::io::BufRead;
use std::ops::AddAssign;
use std::path::Path;

/// Per-unit (or summed) ingestion counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub units: u64,
    pub lines: u64,
    pub records: u64,
    pub blank: u64,
    pub malformed_envelope: u64,
    pub malformed_field: u64,
    /// `insert_many` calls issued.
    pub batches: u64,
}

impl IngestStats {
    pub fn skipped(&self) -> u64 {
        self.blank + self.malformed_envelope + self.malformed_field
    }
}

impl AddAssign for IngestStats {
    fn add_assign(&mut self, o: Self) {
        self.units += o.units;
        self.lines += o.lines;
        self.records += o.records;
        self.blank += o.blank;
        self.malformed_envelope += o.malformed_envelope;
        self.malformed_field += o.malformed_field;
        self.batches += o.batches;
    }
}

/// Normalizes lines and flushes them to the raw store in fixed-size batches.
pub struct BatchIngestor<'s, S: RawStore + ?Sized> {
    store: &'s S,
    batch_size: usize,
    policy: MalformedFieldPolicy,
}

impl<'s, S: RawStore + ?Sized> BatchIngestor<'s, S> {
    pub fn new(store: &'s S, batch_size: usize, policy: MalformedFieldPolicy) -> Self {
        Self { store, batch_size: batch_size.max(1), policy }
    }

    /// Ingest already-decoded NDJSON from `reader`.
    pub fn ingest_reader<R: BufRead>(&self, reader: R) -> Result<IngestStats> {
        let mut run = UnitRun::new(self);
        for_each_line(reader, |line_no, line| run.on_line(line_no, line))?;
        run.finish()
    }

    /// Decode and ingest one compressed input unit. `on_progress` receives
    /// compressed bytes consumed.
    pub fn ingest_path(
        &self,
        path: &Path,
        read_buf_bytes: usize,
        on_progress: impl FnMut(u64),
    ) -> Result<IngestStats> {
        let mut run = UnitRun::new(self);
        for_each_line_in_file(path, read_buf_bytes, on_progress, |line_no, line| run.on_line(line_no, line))?;
        let stats = run.finish()?;
        tracing::info!(
            path = %path.display(),
            lines = stats.lines,
            records = stats.records,
            skipped = stats.skipped(),
            batches = stats.batches,
            "ingested input unit"
        );
        Ok(stats)
    }
}

/// State for a single unit: the pending batch and its counters.
struct UnitRun<'i, 's, S: RawStore + ?Sized> {
    ingestor: &'i BatchIngestor<'s, S>,
    buffer: Vec<NormalizedWinRecord>,
    stats: IngestStats,
}

impl<'i, 's, S: RawStore + ?Sized> UnitRun<'i, 's, S> {
    fn new(ingestor: &'i BatchIngestor<'s, S>) -> Self {
        Self {
            ingestor,
            buffer: Vec::with_capacity(ingestor.batch_size),
            stats: IngestStats { units: 1, ..Default::default() },
        }
    }

    fn on_line(&mut self, line_no: u64, line: &str) -> Result<()> {
        self.stats.lines += 1;
        let outcome = normalize_line(line, self.ingestor.policy)
            .with_context(|| format!("line {line_no}"))?;
        match outcome {
            LineOutcome::Record(rec) => {
                self.buffer.push(rec);
                self.stats.records += 1;
                if self.buffer.len() >= self.ingestor.batch_size {
                    self.flush()?;
                }
            }
            LineOutcome::Skipped(SkipReason::Blank) => self.stats.blank += 1,
            LineOutcome::Skipped(SkipReason::MalformedEnvelope) => {
                self.stats.malformed_envelope += 1;
                tracing::debug!(line = line_no, "skipping malformed line");
            }
            LineOutcome::Skipped(SkipReason::MalformedField(e)) => {
                self.stats.malformed_field += 1;
                tracing::warn!(line = line_no, field = e.field(), error = %e, "skipping line with malformed field");
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.ingestor
            .store
            .insert_many(&self.buffer)
            .with_context(|| format!("insert batch of {} records", self.buffer.len()))?;
        self.stats.batches += 1;
        self.buffer.clear();
        Ok(())
    }

    /// Flush the trailing partial batch.
    fn finish(mut self) -> Result<IngestStats> {
        self.flush()?;
        Ok(self.stats)
    }
}
