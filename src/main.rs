use anyhow::Result;
use bidwin::{init_tracing_once, BidWinPipeline, NdjsonAggregateStore, NdjsonRawStore};
use std::path::PathBuf;

const INPUT_ROOT: &str = "./raw-bid-win";
const STORE_DIR: &str = "./bidwin_store";
const OUTPUT_PATH: &str = "./result_dump.json";
const BATCH_SIZE: usize = 1000;

fn main() -> Result<()> {
    init_tracing_once();

    let store_dir = PathBuf::from(STORE_DIR);
    let raw = NdjsonRawStore::open(&store_dir.join("individualWins"))?;
    let agg = NdjsonAggregateStore::open(&store_dir.join("geoAggregation"))?;

    let summary = BidWinPipeline::new()
        .input_root(INPUT_ROOT)
        .extensions(["gz"])
        .batch_size(BATCH_SIZE)
        .output_path(OUTPUT_PATH)
        .progress(true)
        .progress_label("Ingesting bid wins")
        .run(&raw, &agg)?;

    println!(
        "Ingested {} records from {} files ({} lines skipped); {} buckets ({} new, {} updated); exported {} to {}",
        summary.ingest.records,
        summary.ingest.units,
        summary.ingest.skipped(),
        summary.buckets,
        summary.merge.inserted,
        summary.merge.matched,
        summary.exported,
        OUTPUT_PATH,
    );
    Ok(())
}
