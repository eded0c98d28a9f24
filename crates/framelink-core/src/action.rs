//! Host notifications in, host actions out.

use std::time::Duration;

use crate::{dispatch::MessageEvent, endpoint::ChannelId, host::FrameId, origin::Origin};

/// Notification the host raises for a relay frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEvent {
    /// Relay document finished loading (fresh navigation)
    Load,
    /// Relay was resized after a fragment-only re-navigation
    Resize,
}

/// Actions returned by endpoints and the handshake state machine.
///
/// The host executes these:
/// - `CreateRelay` / `NavigateRelay`: create or re-navigate an endpoint's
///   own relay frame
/// - `SpawnDisposableRelay`: one-shot stage 2 relay, removed after a grace
///   period once loaded
/// - `Deliver`: hand an event to a context's dispatcher
/// - `PostMessage`: native primitive, scoped to an origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelAction {
    /// Append a relay frame to `owner` and load `location`.
    CreateRelay {
        /// Frame hosting the endpoint
        owner: FrameId,
        /// Endpoint that owns the relay
        channel: ChannelId,
        /// Target proxy location with the stage 1 fragment
        location: String,
        /// Initial width
        width: u32,
        /// Fixed height
        height: u32,
    },

    /// Re-navigate an endpoint's relay without reloading its document.
    NavigateRelay {
        /// Frame hosting the endpoint
        owner: FrameId,
        /// Endpoint that owns the relay
        channel: ChannelId,
        /// Target proxy location with the new fragment
        location: String,
        /// New width; always differs from the previous one
        width: u32,
    },

    /// Append a single-use relay to `parent`, load it, and remove it
    /// `dispose_after` after its load event.
    SpawnDisposableRelay {
        /// Frame to attach the relay to
        parent: FrameId,
        /// Initiator proxy location with the stage 2 fragment
        location: String,
        /// Grace period after load before removal
        dispose_after: Duration,
    },

    /// Dispatch an authenticated message inside `context`.
    Deliver {
        /// Frame whose dispatcher receives the event
        context: FrameId,
        /// The message
        event: MessageEvent,
    },

    /// Send through the host's native primitive.
    PostMessage {
        /// Sending frame
        source: FrameId,
        /// Receiving frame
        target: FrameId,
        /// Deliver only if the receiver's origin is exactly this
        target_origin: Origin,
        /// JSON text of the message
        data: String,
    },
}
