mod config;
mod error;
mod record;
mod util;
mod paths;
mod progress;
mod ndjson;
mod compressed_jsonl;

mod normalize;
mod ingest;
mod store;
mod file_store;
mod aggregate;
mod merge;
mod export;
mod pipeline;

pub use crate::config::{MalformedFieldPolicy, PipelineOptions};
pub use crate::error::NormalizeError;
pub use crate::record::{AggregateBucket, BucketValues, GroupKey, MergeStats, NormalizedWinRecord, UpsertOp, NA, OTHERS};
pub use crate::pipeline::{BidWinPipeline, RunSummary};

// RecordNormalizer: line-level entry point plus the pure fallback extractors.
pub use crate::normalize::{
    bid_request, normalize_event, normalize_line, parse_bid_timestamp, parse_win_price, resolve_geo,
    scalar_text, LineOutcome, SkipReason, WIN_PRICE_SUFFIX,
};

// BatchIngestor and the decoding layer beneath it.
pub use crate::ingest::{BatchIngestor, IngestStats};
pub use crate::compressed_jsonl::{for_each_line, for_each_line_in_file, InputCodec};
pub use crate::paths::discover_inputs;

// Store seams and the bundled backends.
pub use crate::store::{AggregateStore, MemoryAggregateStore, MemoryRawStore, RawStore};
pub use crate::file_store::{NdjsonAggregateStore, NdjsonRawStore};

// Aggregation, merge, export.
pub use crate::aggregate::{aggregate, BucketStats, Grouping};
pub use crate::merge::merge_buckets;
pub use crate::export::export_json;

// NDJSON helpers and tracing setup for binaries.
pub use crate::ndjson::{NdjsonReader, NdjsonWriter};
pub use crate::util::init_tracing_once;
