#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("decode error: {reason}")]
    Decode { reason: String },

    #[error("no token metadata for mint {mint}")]
    UnresolvedMetadata { mint: String },

    #[error("degenerate utilization: {reason}")]
    DegenerateUtilization { reason: String },

    #[error("undefined rate: {reason}")]
    UndefinedRate { reason: String },

    #[error("{field} does not fit in a decimal")]
    Overflow { field: &'static str },

    #[error("account provider error: {reason}")]
    Provider { reason: String },

    #[error("token list error: {reason}")]
    TokenList { reason: String },

    #[error("config error: {reason}")]
    Config { reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// `true` for failures confined to a single reserve. The aggregator
    /// drops that reserve and keeps going; anything else aborts the batch.
    pub fn is_reserve_local(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. }
                | Self::UnresolvedMetadata { .. }
                | Self::DegenerateUtilization { .. }
                | Self::UndefinedRate { .. }
                | Self::Overflow { .. }
        )
    }
}
