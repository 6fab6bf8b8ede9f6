//! Canonical record types: the normalized win row, the composite group key, and
//! the aggregate bucket persisted per key.

use serde::{Deserialize, Serialize};

/// Default for missing account/creative/auction identifiers.
pub const NA: &str = "NA";
/// Default for missing bid-request attributes (user agent, site, exchange, geo).
pub const OTHERS: &str = "Others";

/// One auction win projected onto the canonical schema.
/// Every field is always populated; defaults are decided in `normalize`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedWinRecord {
    pub auction_id: String,
    pub campaign_id: String,
    pub creative_id: String,
    pub adgroup_id: String,
    pub user_agent: String,
    pub site: String,
    pub geo: String,
    pub exchange: String,
    pub price: f64,
    pub time: i64,
}

impl NormalizedWinRecord {
    /// The composite key this record aggregates under.
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            campaign_id: self.campaign_id.clone(),
            creative_id: self.creative_id.clone(),
            adgroup_id: self.adgroup_id.clone(),
            geo: self.geo.clone(),
            time: self.time,
        }
    }
}

/// Composite key `(campaignId, creativeId, adgroupId, geo, time)`.
/// Ordering is lexicographic over the tuple in field order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupKey {
    pub campaign_id: String,
    pub creative_id: String,
    pub adgroup_id: String,
    pub geo: String,
    pub time: i64,
}

/// The four numeric reductions stored per key.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketValues {
    pub total_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub total_count: u64,
}

impl BucketValues {
    /// JSON has no encoding for inf/NaN; such values would come back as `null`.
    pub fn is_finite(&self) -> bool {
        self.total_price.is_finite() && self.min_price.is_finite() && self.max_price.is_finite()
    }
}

/// Key plus values, flattened into a single JSON object when serialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateBucket {
    #[serde(flatten)]
    pub key: GroupKey,
    #[serde(flatten)]
    pub values: BucketValues,
}

/// A single match-or-insert instruction for the aggregate store.
#[derive(Clone, Debug, PartialEq)]
pub struct UpsertOp {
    pub filter: GroupKey,
    pub set: BucketValues,
}

impl From<AggregateBucket> for UpsertOp {
    fn from(b: AggregateBucket) -> Self {
        Self { filter: b.key, set: b.values }
    }
}

/// Outcome of one bulk upsert.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Ops whose key already existed (values overwritten).
    pub matched: u64,
    /// Ops that created a new record.
    pub inserted: u64,
}

impl MergeStats {
    pub fn total(&self) -> u64 {
        self.matched + self.inserted
    }
}
