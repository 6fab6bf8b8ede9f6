use thiserror::Error;

/// Field-level failures raised while normalizing a syntactically valid line.
/// Envelope failures (bad outer JSON) never surface here; they are skips.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("unparseable win price {raw:?}")]
    Price { raw: String },

    #[error("unparseable bid timestamp {raw:?}: {reason}")]
    Timestamp { raw: String, reason: String },
}

impl NormalizeError {
    /// Short label used in logs and stats.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Price { .. } => "winPrice",
            Self::Timestamp { .. } => "timestamp",
        }
    }
}
