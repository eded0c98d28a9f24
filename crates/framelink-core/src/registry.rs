//! Responder-side handshake secrets.
//!
//! A responder records one entry per initiator identity when it accepts a
//! stage 1 request. The entry outlives the relay that created it; stage 3
//! checks the echoed `NB` against it and stage 4 derives the sender origin
//! from its `URIA`.
//!
//! Registration is first-wins: a second request under the same initiator
//! identity is refused rather than replacing the first. That keeps a racing
//! duplicate handshake from swapping secrets under a live channel, at the
//! cost that whoever registers an identity first blocks later reuse of it.

use std::collections::HashMap;

use crate::endpoint::ChannelId;

/// Secrets agreed with one initiator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginEntry {
    /// Initiator nonce
    pub na: String,
    /// Initiator proxy location
    pub uria: String,
    /// Responder nonce
    pub nb: String,
    /// Responder location, fragment stripped
    pub urib: String,
}

/// Initiator identity → agreed secrets.
#[derive(Debug, Default)]
pub struct OriginRegistry {
    entries: HashMap<ChannelId, OriginEntry>,
}

impl OriginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record secrets for `origin_id`.
    ///
    /// Returns `false` and leaves the registry untouched if `origin_id` is
    /// already registered.
    pub fn register(&mut self, origin_id: ChannelId, entry: OriginEntry) -> bool {
        if self.entries.contains_key(&origin_id) {
            return false;
        }

        self.entries.insert(origin_id, entry);
        true
    }

    /// Secrets for `origin_id`. `None` if it never completed stage 1 here.
    pub fn get(&self, origin_id: &ChannelId) -> Option<&OriginEntry> {
        self.entries.get(origin_id)
    }

    /// Check if `origin_id` is registered.
    pub fn contains(&self, origin_id: &ChannelId) -> bool {
        self.entries.contains_key(origin_id)
    }

    /// Number of registered initiators.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no initiator is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(nb: &str) -> OriginEntry {
        OriginEntry {
            na: "na".to_string(),
            uria: "https://a.example/proxy.html".to_string(),
            nb: nb.to_string(),
            urib: "https://b.example/app.html".to_string(),
        }
    }

    #[test]
    fn first_registration_wins() {
        let mut registry = OriginRegistry::new();
        let id = ChannelId::from("channel-1");

        assert!(registry.register(id.clone(), entry("first")));
        assert!(!registry.register(id.clone(), entry("second")));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&id).map(|e| e.nb.as_str()), Some("first"));
    }

    #[test]
    fn unknown_initiator() {
        let registry = OriginRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains(&ChannelId::from("nobody")));
        assert!(registry.get(&ChannelId::from("nobody")).is_none());
    }
}
