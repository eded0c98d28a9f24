//! Error types for envelope encoding and decoding.

use thiserror::Error;

/// Result alias for wire operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors produced while turning fragment text into envelopes, or back.
///
/// Decoding errors never travel back to the peer. The receiving side drops
/// the navigation event and at most logs the variant locally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Fragment text is not a JSON object of the expected shape.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// Fragment looked percent-encoded but did not decode to UTF-8 text.
    #[error("invalid percent-encoding in fragment")]
    PercentEncoding,

    /// Envelope object carries no integer `stage` field.
    #[error("envelope has no stage")]
    MissingStage,

    /// Envelope names a stage outside 1..=4.
    #[error("unknown stage {0}")]
    UnknownStage(u64),

    /// A required field is present but empty.
    #[error("stage {stage} envelope has empty field {field}")]
    EmptyField {
        /// Stage of the offending envelope
        stage: u8,
        /// Wire name of the empty field
        field: &'static str,
    },

    /// Outbound value has no JSON representation.
    #[error("message cannot be encoded: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for WireError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
