//! Error types for the framelink core.
//!
//! Two families, kept apart on purpose:
//!
//! - [`ChannelError`] is returned to the application that opened or uses a
//!   channel. It is an ordinary failure value; the caller decides whether to
//!   retry.
//! - [`Rejection`] explains why a relay event was discarded. The host logs
//!   it locally and does nothing else: the peer gets no response at all, so
//!   an adversarial peer learns nothing about which check failed.

use framelink_proto::{Stage, WireError};
use thiserror::Error;

use crate::{endpoint::ChannelId, origin::OriginError};

/// Caller-facing channel failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// A construction argument was empty
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    /// A location did not yield an origin
    #[error(transparent)]
    InvalidLocation(#[from] OriginError),

    /// Handshake has not completed; nothing was sent or queued
    #[error("channel {0} is not ready")]
    NotReady(ChannelId),

    /// Message has no wire representation
    #[error("message cannot be encoded: {0}")]
    Encode(String),

    /// No endpoint with this identity in the context
    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),
}

impl From<WireError> for ChannelError {
    fn from(err: WireError) -> Self {
        Self::Encode(err.to_string())
    }
}

/// Reason a relay event was discarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Fragment did not decode to a complete envelope
    #[error("malformed fragment: {0}")]
    Malformed(#[from] WireError),

    /// Host has no relay context for the notified frame
    #[error("relay frame unavailable")]
    RelayUnavailable,

    /// Relay instance already carries handshake state
    #[error("relay already claimed by a handshake")]
    RelayClaimed,

    /// Envelope stage does not follow the relay's recorded stage
    #[error("{received} not accepted at recorded stage {current:?}")]
    StageMismatch {
        /// Stage recorded in the relay
        current: Option<Stage>,
        /// Stage of the envelope
        received: Stage,
    },

    /// Target frame name did not resolve, or is not reachable
    #[error("target frame {0:?} not found")]
    TargetNotFound(String),

    /// Initiator identity already registered with the responder
    #[error("initiator {0} already registered")]
    DuplicateInitiator(ChannelId),

    /// No reachable frame hosts the endpoint named in a response
    #[error("no endpoint for channel {0}")]
    EndpointNotFound(ChannelId),

    /// Responder has no secrets for the initiator
    #[error("no registration for initiator {0}")]
    UnknownInitiator(ChannelId),

    /// Endpoint already learned its responder nonce
    #[error("responder nonce already recorded for {0}")]
    Replay(ChannelId),

    /// A nonce did not match the recorded one
    #[error("nonce mismatch")]
    NonceMismatch,

    /// Responder location is not at the origin the endpoint expects
    #[error("responder origin {found} does not match expected {expected}")]
    OriginMismatch {
        /// Origin derived from the endpoint's target proxy
        expected: String,
        /// Origin claimed by the response
        found: String,
    },

    /// A recorded location did not yield an origin
    #[error(transparent)]
    InvalidLocation(#[from] OriginError),

    /// Endpoint uses the native primitive and runs no handshake
    #[error("channel {0} does not use relays")]
    NativeChannel(ChannelId),
}
