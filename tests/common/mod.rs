#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// `2017-01-11T00:59:59.123Z` as epoch seconds.
pub const TS_0059: i64 = 1484096399;
/// `2017-01-11T01:00:00.5Z` as epoch seconds.
pub const TS_0100: i64 = 1484096400;

/// Write a gzip file containing the provided JSONL lines.
pub fn write_gz_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = flate2::write::GzEncoder::new(f, flate2::Compression::default());
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

/// Write a zstd file containing the provided JSONL lines.
pub fn write_zst_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

/// A bid-win event shaped like the exchange logs: top-level account fields, a
/// `USD/1M` price string and the bid request embedded as a JSON *string*.
pub fn bid_event(auction: &str, campaign: &str, country: Option<&str>, price: &str, ts: &str) -> Value {
    let mut device = json!({ "ext": { "geo_criteria_id": 2840 } });
    if let Some(c) = country {
        device["geo"] = json!({ "country": c });
    }
    let req = json!({
        "userAgent": "Mozilla/5.0",
        "url": "http://news.example.com/a",
        "exchange": "adx",
        "timestamp": ts,
        "device": device,
    });
    json!({
        "auctionId": auction,
        "biddingMainAccount": campaign,
        "bidResponseCreativeName": "creative-1",
        "biddingSubAccount": "adgroup-1",
        "winPrice": price,
        "bidRequestString": req.to_string(),
    })
}

/// Build a small `raw-bid-win/YYYY/MM/DD/HH/MM/*.gz` tree:
/// - unit A: 3 wins for camp-1/USA at 00:59:59 (1.0, 3.0, 2.0) + one broken line
/// - unit B: 1 win for camp-1/USA at 00:59:59 (4.0), 1 win for camp-2 with no country
///   (falls back to geo_criteria_id 2840) at 01:00:00 (0.5)
/// - a `.txt` file that discovery must ignore
pub fn make_input_tree() -> PathBuf {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.into_path();
    let root = base.join("raw-bid-win");

    let a = root.join("2017/01/11/00/59").join("HVuIhurmB5909SKcwGMX.gz");
    write_gz_lines(
        &a,
        &[
            bid_event("a1", "camp-1", Some("USA"), "1.0USD/1M", "2017-01-11T00:59:59.123Z").to_string(),
            bid_event("a2", "camp-1", Some("USA"), "3.0USD/1M", "2017-01-11T00:59:59.999Z").to_string(),
            "{not json".to_string(),
            bid_event("a3", "camp-1", Some("USA"), "2.0USD/1M", "2017-01-11T00:59:59.123Z").to_string(),
        ],
    );

    let b = root.join("2017/01/11/01/00").join("Xq2kL0pPz7.gz");
    write_gz_lines(
        &b,
        &[
            bid_event("b1", "camp-1", Some("USA"), "4.0USD/1M", "2017-01-11T00:59:59.123Z").to_string(),
            bid_event("b2", "camp-2", None, "0.5USD/1M", "2017-01-11T01:00:00.5Z").to_string(),
        ],
    );

    fs::write(root.join("2017/01/11/README.txt"), "not an input").unwrap();
    base
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}
