//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from the host's source of randomness. Channel
//! identities and both handshake nonces come from here, so a seeded
//! environment makes an entire handshake reproducible.

/// Abstract environment providing randomness.
///
/// # Security
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production.
///   Nonces generated from a predictable source let any frame that can guess
///   them forge stage 3 and stage 4 navigations.
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion, incorrect simulation setup)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a fresh unique identifier in RFC 4122 v4 text form.
    ///
    /// Used for endpoint identities and for both handshake nonces.
    fn unique_id(&self) -> String {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
    }
}
