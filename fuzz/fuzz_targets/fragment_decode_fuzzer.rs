//! Fuzz target for fragment decoding
//!
//! A relay decodes whatever text ends up in its fragment. This fuzzer feeds
//! arbitrary text through normalization and envelope decoding to find:
//! - Panics in percent-decoding
//! - Envelopes that decode but fail to re-encode
//! - Decoded envelopes with empty required fields
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use framelink_proto::{compose_location, fragment_of, Envelope};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(envelope) = Envelope::from_fragment(text) else {
        return;
    };

    // Anything accepted must survive a trip through a relay location.
    let location = compose_location("https://fuzz.example/proxy.html", &envelope)
        .expect("decoded envelope must encode");
    let again =
        Envelope::from_fragment(fragment_of(&location)).expect("composed location must decode");
    assert_eq!(again, envelope);
});
