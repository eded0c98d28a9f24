//! Channel configuration.

use std::time::Duration;

/// Height of every relay frame. Only the width changes.
pub const DEFAULT_RELAY_HEIGHT: u32 = 100;

/// Width a relay is created with.
pub const DEFAULT_NARROW_WIDTH: u32 = 100;

/// Width a relay toggles to on alternate re-navigations.
pub const DEFAULT_WIDE_WIDTH: u32 = 300;

/// Time a disposable stage 2 relay stays attached after its load event.
pub const DEFAULT_DISPOSE_AFTER: Duration = Duration::from_secs(1);

/// How an endpoint reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    /// Relay frames and the fragment handshake
    #[default]
    Fragment,
    /// The host's native origin-scoped messaging primitive; no handshake
    Native,
}

/// Relay frame dimensions.
///
/// Every re-navigation flips the width between `narrow` and `wide`. Hosts
/// only fire a resize notification on an actual size change, and a
/// fragment-only navigation fires nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayGeometry {
    /// Fixed relay height
    pub height: u32,
    /// Initial width
    pub narrow: u32,
    /// Alternate width
    pub wide: u32,
}

impl RelayGeometry {
    /// Width to use on the next navigation after `current`.
    #[must_use]
    pub fn toggle(&self, current: u32) -> u32 {
        if current == self.narrow { self.wide } else { self.narrow }
    }
}

impl Default for RelayGeometry {
    fn default() -> Self {
        Self {
            height: DEFAULT_RELAY_HEIGHT,
            narrow: DEFAULT_NARROW_WIDTH,
            wide: DEFAULT_WIDE_WIDTH,
        }
    }
}

/// Per-context channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Transport used by endpoints opened in this context
    pub mode: ChannelMode,
    /// Relay frame dimensions
    pub relay: RelayGeometry,
    /// Grace period before a used disposable relay is removed
    pub dispose_after: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            mode: ChannelMode::default(),
            relay: RelayGeometry::default(),
            dispose_after: DEFAULT_DISPOSE_AFTER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_alternates() {
        let geometry = RelayGeometry::default();
        let first = geometry.toggle(geometry.narrow);
        let second = geometry.toggle(first);

        assert_eq!(first, 300);
        assert_eq!(second, 100);
    }

    #[test]
    fn defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.mode, ChannelMode::Fragment);
        assert_eq!(config.relay.height, 100);
        assert_eq!(config.dispose_after, Duration::from_secs(1));
    }
}
