//! Line → `NormalizedWinRecord`. All defaulting and fallback decisions live here;
//! nothing downstream ever sees a missing field.
//!
//! The extractors are pure functions over `serde_json::Value` so the fallback
//! order can be tested without touching a store.

use crate::config::MalformedFieldPolicy;
use crate::error::NormalizeError;
use crate::record::{NormalizedWinRecord, NA, OTHERS};
use serde_json::Value;
use std::borrow::Cow;
use time::macros::format_description;
use time::PrimitiveDateTime;

/// Literal unit suffix carried by `winPrice` strings, e.g. `"0.42USD/1M"`.
pub const WIN_PRICE_SUFFIX: &str = "USD/1M";

/// Why a line produced no record.
#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    Blank,
    /// Outer line (or the nested bid request) is not a JSON object.
    MalformedEnvelope,
    /// Price or timestamp present but unparseable, under `MalformedFieldPolicy::Skip`.
    MalformedField(NormalizeError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum LineOutcome {
    Record(NormalizedWinRecord),
    Skipped(SkipReason),
}

/// Normalize one raw line.
///
/// Envelope problems are always skips. Field problems follow `policy`:
/// `Skip` reports them as `SkipReason::MalformedField`, `Abort` returns the error.
pub fn normalize_line(line: &str, policy: MalformedFieldPolicy) -> Result<LineOutcome, NormalizeError> {
    if line.trim().is_empty() {
        return Ok(LineOutcome::Skipped(SkipReason::Blank));
    }
    let event: Value = match serde_json::from_str(line) {
        Ok(v @ Value::Object(_)) => v,
        _ => return Ok(LineOutcome::Skipped(SkipReason::MalformedEnvelope)),
    };
    match normalize_event(&event) {
        Ok(Some(rec)) => Ok(LineOutcome::Record(rec)),
        Ok(None) => Ok(LineOutcome::Skipped(SkipReason::MalformedEnvelope)),
        Err(e) => match policy {
            MalformedFieldPolicy::Skip => Ok(LineOutcome::Skipped(SkipReason::MalformedField(e))),
            MalformedFieldPolicy::Abort => Err(e),
        },
    }
}

/// Project an already-parsed event object. `Ok(None)` means the nested bid
/// request could not be decoded, which counts as a malformed envelope.
pub fn normalize_event(event: &Value) -> Result<Option<NormalizedWinRecord>, NormalizeError> {
    let Some(req) = bid_request(event) else {
        return Ok(None);
    };
    let req = req.as_ref();

    Ok(Some(NormalizedWinRecord {
        auction_id: text_or(event.get("auctionId"), NA),
        campaign_id: text_or(event.get("biddingMainAccount"), NA),
        creative_id: text_or(event.get("bidResponseCreativeName"), NA),
        adgroup_id: text_or(event.get("biddingSubAccount"), NA),
        user_agent: text_or(req.get("userAgent"), OTHERS),
        site: text_or(req.get("url"), OTHERS),
        geo: resolve_geo(req),
        exchange: text_or(req.get("exchange"), OTHERS),
        price: win_price(event.get("winPrice"))?,
        time: bid_time(req.get("timestamp"))?,
    }))
}

/// Decode `bidRequestString`. Absent, null or blank → `{}`. An embedded object is
/// taken as-is. Returns `None` when the string is not JSON or not an object.
pub fn bid_request(event: &Value) -> Option<Cow<'_, Value>> {
    match event.get("bidRequestString") {
        None | Some(Value::Null) => Some(Cow::Owned(Value::Object(Default::default()))),
        Some(v @ Value::Object(_)) => Some(Cow::Borrowed(v)),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Some(Cow::Owned(Value::Object(Default::default())))
        }
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(v @ Value::Object(_)) => Some(Cow::Owned(v)),
            _ => None,
        },
        Some(_) => None,
    }
}

/// Render a scalar as text: strings verbatim, numbers/bools via their JSON form.
/// Null, arrays and objects count as absent.
pub fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[inline]
fn text_or(v: Option<&Value>, default: &str) -> String {
    v.and_then(scalar_text).unwrap_or_else(|| default.to_string())
}

/// Geo fallback chain: `device.geo.country`, and only when that resolves to the
/// `"Others"` sentinel, `device.ext.geo_criteria_id`. Never unresolved.
pub fn resolve_geo(bid_request: &Value) -> String {
    let country = text_or(bid_request.pointer("/device/geo/country"), OTHERS);
    if country != OTHERS {
        return country;
    }
    text_or(bid_request.pointer("/device/ext/geo_criteria_id"), OTHERS)
}

/// Parse a `winPrice` string: strip every `USD/1M`, trim, parse as f64.
/// Non-finite results are rejected so they can never reach storage as `null`.
pub fn parse_win_price(raw: &str) -> Result<f64, NormalizeError> {
    let residual = raw.replace(WIN_PRICE_SUFFIX, "");
    match residual.trim().parse::<f64>() {
        Ok(p) if p.is_finite() => Ok(p),
        _ => Err(NormalizeError::Price { raw: raw.to_string() }),
    }
}

fn win_price(v: Option<&Value>) -> Result<f64, NormalizeError> {
    match v {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::String(s)) => parse_win_price(s),
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|p| p.is_finite())
            .ok_or_else(|| NormalizeError::Price { raw: n.to_string() }),
        Some(other) => Err(NormalizeError::Price { raw: other.to_string() }),
    }
}

/// Parse `YYYY-MM-DDTHH:MM:SS.fffZ` as UTC and truncate to epoch seconds.
pub fn parse_bid_timestamp(raw: &str) -> Result<i64, NormalizeError> {
    let fmt = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]Z");
    PrimitiveDateTime::parse(raw, fmt)
        .map(|dt| dt.assume_utc().unix_timestamp())
        .map_err(|e| NormalizeError::Timestamp { raw: raw.to_string(), reason: e.to_string() })
}

fn bid_time(v: Option<&Value>) -> Result<i64, NormalizeError> {
    match v {
        None | Some(Value::Null) => Ok(0),
        Some(Value::String(s)) if s.is_empty() => Ok(0),
        Some(Value::String(s)) => parse_bid_timestamp(s),
        Some(other) => Err(NormalizeError::Timestamp {
            raw: other.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}
