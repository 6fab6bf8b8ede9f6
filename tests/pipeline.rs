#[path = "common/mod.rs"]
mod common;

use bidwin::{
    AggregateStore, BidWinPipeline, MalformedFieldPolicy, MemoryAggregateStore, MemoryRawStore, NdjsonAggregateStore,
    NdjsonRawStore, RawStore,
};
use common::*;

fn pipeline_for(base: &std::path::Path) -> BidWinPipeline {
    BidWinPipeline::new()
        .input_root(base.join("raw-bid-win"))
        .extensions([".GZ"])
        .batch_size(2)
        .output_path(base.join("result_dump.json"))
        .progress(false)
}

/// Discovery walks the whole tree, keeps only `.gz`, and returns a sorted list.
#[test]
fn discovers_nested_gz_units() {
    let base = make_input_tree();
    let files = pipeline_for(&base).discover_inputs();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|p| p.extension().unwrap() == "gz"));
    let mut sorted = files.clone();
    sorted.sort();
    assert_eq!(files, sorted);
}

/// Missing input root is not an error: nothing ingested, empty export.
#[test]
fn missing_root_exports_empty_array() {
    let dir = tempfile::tempdir().unwrap();
    let raw = MemoryRawStore::new();
    let agg = MemoryAggregateStore::new();
    let summary = pipeline_for(dir.path()).run(&raw, &agg).unwrap();
    assert_eq!(summary.ingest.records, 0);
    assert_eq!(summary.buckets, 0);
    assert_eq!(agg.bulk_calls(), 0);
    assert_eq!(read_json(&dir.path().join("result_dump.json")), serde_json::json!([]));
}

/// Full run over the fixture tree with file-backed stores:
/// - 5 valid wins across 2 units (1 broken line skipped)
/// - camp-1/USA/00:59:59 → 4 wins, 1+3+2+4 = 10, min 1, max 4
/// - camp-2 has no country → geo "2840" at 01:00:00, single 0.5 win
#[test]
fn end_to_end_with_file_stores() {
    let base = make_input_tree();
    let raw = NdjsonRawStore::open(&base.join("store/individualWins")).unwrap();
    let agg = NdjsonAggregateStore::open(&base.join("store/geoAggregation")).unwrap();
    let pipeline = pipeline_for(&base);

    let summary = pipeline.run(&raw, &agg).unwrap();
    assert_eq!(summary.ingest.units, 2);
    assert_eq!(summary.ingest.records, 5);
    assert_eq!(summary.ingest.malformed_envelope, 1);
    // unit A: 3 records at B=2 → 2 inserts; unit B: 2 records → 1 insert
    assert_eq!(summary.ingest.batches, 3);
    assert_eq!(summary.buckets, 2);
    assert_eq!(summary.merge.inserted, 2);
    assert_eq!(summary.exported, 2);
    assert_eq!(raw.count().unwrap(), 5);

    let out = read_json(&base.join("result_dump.json"));
    let rows = out.as_array().unwrap();
    let find = |campaign: &str| rows.iter().find(|r| r["campaignId"] == campaign).unwrap();

    let c1 = find("camp-1");
    assert_eq!(c1["geo"], "USA");
    assert_eq!(c1["time"], TS_0059);
    assert_eq!(c1["totalPrice"], 10.0);
    assert_eq!(c1["minPrice"], 1.0);
    assert_eq!(c1["maxPrice"], 4.0);
    assert_eq!(c1["totalCount"], 4);

    let c2 = find("camp-2");
    assert_eq!(c2["geo"], "2840");
    assert_eq!(c2["time"], TS_0100);
    assert_eq!(c2["totalCount"], 1);

    // Re-running only aggregate+merge and export is a no-op on the results.
    let before = agg.find_all().unwrap();
    let (buckets, merge) = pipeline.aggregate_and_merge(&raw, &agg).unwrap();
    assert_eq!(buckets, 2);
    assert_eq!((merge.matched, merge.inserted), (2, 0));
    assert_eq!(agg.find_all().unwrap(), before);
    pipeline.export(&agg).unwrap();
    assert_eq!(read_json(&base.join("result_dump.json")), out);
}

/// Raw data growing between runs recomputes the superset correctly.
#[test]
fn rerun_after_more_input_recomputes() {
    let base = make_input_tree();
    let raw = MemoryRawStore::new();
    let agg = MemoryAggregateStore::new();
    let pipeline = pipeline_for(&base);
    pipeline.run(&raw, &agg).unwrap();

    let extra = base.join("raw-bid-win/2017/01/12/00/00/late.gz");
    write_gz_lines(
        &extra,
        &[bid_event("c1", "camp-1", Some("USA"), "6.0USD/1M", "2017-01-11T00:59:59.123Z").to_string()],
    );
    pipeline.ingest_files(&[extra], &raw).unwrap();
    pipeline.aggregate_and_merge(&raw, &agg).unwrap();

    assert_eq!(agg.count().unwrap(), 2);
    let c1 = agg.find_all().unwrap().into_iter().find(|b| b.key.campaign_id == "camp-1").unwrap();
    assert_eq!(c1.values.total_count, 5);
    assert_eq!(c1.values.total_price, 16.0);
    assert_eq!(c1.values.max_price, 6.0);
}

/// With `Abort`, a malformed price fails the run and the error names the unit.
#[test]
fn abort_policy_fails_the_run_with_context() {
    let base = make_input_tree();
    let bad = base.join("raw-bid-win/2017/01/11/02/00/bad.gz");
    write_gz_lines(
        &bad,
        &[bid_event("x", "camp-9", Some("USA"), "??USD/1M", "2017-01-11T00:59:59.123Z").to_string()],
    );

    let raw = MemoryRawStore::new();
    let agg = MemoryAggregateStore::new();
    let err = pipeline_for(&base)
        .malformed_fields(MalformedFieldPolicy::Abort)
        .run(&raw, &agg)
        .unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("ingest stage"), "{msg}");
    assert!(msg.contains("bad.gz"), "{msg}");

    // Default policy skips the same line and completes.
    let raw = MemoryRawStore::new();
    let summary = pipeline_for(&base).run(&raw, &agg).unwrap();
    assert_eq!(summary.ingest.malformed_field, 1);
    assert_eq!(summary.ingest.records, 5);
}
