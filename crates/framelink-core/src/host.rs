//! Host environment seams.
//!
//! The protocol never touches a real frame. It asks the host for the shape
//! of the frame hierarchy ([`FrameTree`]) and for the per-frame channel state
//! it is allowed to reach ([`Host`]). Browser bindings implement these over
//! `window.frames`; the simulation harness implements them over an in-memory
//! tree.

use std::fmt;

use crate::context::ChannelContext;

/// Opaque handle to a frame (an execution context) in the host hierarchy.
///
/// Handles are never evidence of identity. A handle may be reused by a
/// later navigation, so authentication always goes through origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Read-only view of the frame hierarchy.
pub trait FrameTree {
    /// Top-level frame of the hierarchy.
    fn top(&self) -> FrameId;

    /// Parent of `frame`. `None` for the top frame or an unknown handle.
    fn parent(&self, frame: FrameId) -> Option<FrameId>;

    /// Child frames of `frame`, in document order.
    fn children(&self, frame: FrameId) -> Vec<FrameId>;

    /// Declared name of `frame`, if it has one.
    fn name(&self, frame: FrameId) -> Option<&str>;

    /// Current location of `frame`, fragment included.
    fn location(&self, frame: FrameId) -> Option<&str>;
}

/// Frame hierarchy plus access to per-frame channel state.
///
/// Access is mediated: `accessor` is the frame whose code is running, and
/// the host returns `None` whenever that frame may not reach `frame`'s
/// internals (different origin, torn down). Callers treat `None` exactly like
/// "not found".
pub trait Host: FrameTree {
    /// Channel state of `frame`, as seen from `accessor`.
    fn context(&self, accessor: FrameId, frame: FrameId) -> Option<&ChannelContext>;

    /// Mutable channel state of `frame`, as seen from `accessor`.
    fn context_mut(&mut self, accessor: FrameId, frame: FrameId) -> Option<&mut ChannelContext>;
}
