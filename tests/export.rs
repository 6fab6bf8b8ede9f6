#[path = "common/mod.rs"]
mod common;

use bidwin::{export_json, AggregateBucket, AggregateStore, BucketValues, GroupKey, MemoryAggregateStore, UpsertOp};
use common::read_json;
use std::collections::BTreeMap;

fn op(campaign: &str, geo: &str, time: i64, total: f64, count: u64) -> UpsertOp {
    UpsertOp {
        filter: GroupKey {
            campaign_id: campaign.into(),
            creative_id: "cr".into(),
            adgroup_id: "ag".into(),
            geo: geo.into(),
            time,
        },
        set: BucketValues { total_price: total, min_price: 0.5, max_price: total, total_count: count },
    }
}

/// Parsing the artifact back gives exactly the store's contents (as a set).
#[test]
fn exported_array_matches_store() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("result_dump.json");
    let agg = MemoryAggregateStore::new();
    agg.bulk_upsert(&[op("b", "USA", 2, 3.5, 3), op("a", "2840", 0, 1.0, 1), op("a", "USA", 0, 9.0, 4)])
        .unwrap();

    let n = export_json(&agg, &out, false, 64 * 1024).unwrap();
    assert_eq!(n, 3);

    let parsed: Vec<AggregateBucket> = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let as_map = |v: Vec<AggregateBucket>| v.into_iter().map(|b| (b.key, b.values)).collect::<BTreeMap<_, _>>();
    assert_eq!(as_map(parsed), as_map(agg.find_all().unwrap()));

    // Flat objects with the canonical field names.
    let v = read_json(&out);
    let first = v.as_array().unwrap()[0].as_object().unwrap();
    for k in ["campaignId", "creativeId", "adgroupId", "geo", "time", "totalPrice", "minPrice", "maxPrice", "totalCount"] {
        assert!(first.contains_key(k), "missing {k}");
    }
    assert_eq!(first.len(), 9);
}

/// Empty store → `[]`, and a previous artifact is overwritten, not appended to.
#[test]
fn empty_export_overwrites_previous() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("dump.json");
    std::fs::write(&out, "[{\"stale\":true}, {\"stale\":true}]").unwrap();

    let agg = MemoryAggregateStore::new();
    assert_eq!(export_json(&agg, &out, true, 8 * 1024).unwrap(), 0);
    assert_eq!(read_json(&out), serde_json::json!([]));
    // No staging file left behind.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().filter_map(|e| e.ok()).collect();
    assert_eq!(leftovers.len(), 1);
}
