//! Frame lookup by logical name and by channel identity.
//!
//! Both searches walk the hierarchy strictly downward from the start frame
//! (the top frame by default) and never follow parent links, so a host that
//! reports a cycle cannot make them loop. A visited set guards against hosts
//! that list the same child twice.
//!
//! The locator always runs inside a relay, one level below the frame that
//! owns the relay. That is why `"parent"` resolves to the relay's
//! grandparent.

use std::collections::HashSet;

use crate::{
    endpoint::ChannelId,
    host::{FrameId, FrameTree, Host},
};

/// Reserved name for the relay owner's parent.
pub const PARENT: &str = "parent";

/// Reserved name for the top frame.
pub const TOP: &str = "top";

/// Resolve a logical frame name as seen from `relay`.
///
/// `"parent"` and `"top"` resolve structurally. Any other name is searched
/// from the top frame with [`find_by_name_from`].
pub fn find_by_name<T: FrameTree + ?Sized>(
    tree: &T,
    relay: FrameId,
    name: &str,
) -> Option<FrameId> {
    match name {
        PARENT => tree.parent(relay).and_then(|owner| tree.parent(owner)),
        TOP => Some(tree.top()),
        _ => find_by_name_from(tree, tree.top(), name),
    }
}

/// First frame below `start` whose declared name is `name`.
///
/// The children of a frame are all checked before descending into any of
/// them; descent is then depth-first in document order.
pub fn find_by_name_from<T: FrameTree + ?Sized>(
    tree: &T,
    start: FrameId,
    name: &str,
) -> Option<FrameId> {
    let mut visited = HashSet::new();
    search_name(tree, start, name, &mut visited)
}

fn search_name<T: FrameTree + ?Sized>(
    tree: &T,
    frame: FrameId,
    name: &str,
    visited: &mut HashSet<FrameId>,
) -> Option<FrameId> {
    if !visited.insert(frame) {
        return None;
    }

    let children = tree.children(frame);
    if let Some(hit) = children.iter().copied().find(|child| tree.name(*child) == Some(name)) {
        return Some(hit);
    }

    children.into_iter().find_map(|child| search_name(tree, child, name, visited))
}

/// First frame, searching from the top, that hosts the endpoint `id`.
///
/// Frames `accessor` may not reach count as not hosting it.
pub fn find_by_channel<H: Host + ?Sized>(
    host: &H,
    accessor: FrameId,
    id: &ChannelId,
) -> Option<FrameId> {
    find_by_channel_from(host, accessor, host.top(), id)
}

/// Like [`find_by_channel`], starting at `start` instead of the top frame.
pub fn find_by_channel_from<H: Host + ?Sized>(
    host: &H,
    accessor: FrameId,
    start: FrameId,
    id: &ChannelId,
) -> Option<FrameId> {
    let mut visited = HashSet::new();
    search_channel(host, accessor, start, id, &mut visited)
}

fn search_channel<H: Host + ?Sized>(
    host: &H,
    accessor: FrameId,
    frame: FrameId,
    id: &ChannelId,
    visited: &mut HashSet<FrameId>,
) -> Option<FrameId> {
    if !visited.insert(frame) {
        return None;
    }

    if host.context(accessor, frame).is_some_and(|ctx| ctx.hosts_channel(id)) {
        return Some(frame);
    }

    host.children(frame)
        .into_iter()
        .find_map(|child| search_channel(host, accessor, child, id, visited))
}
