//! Property-based tests for envelope decoding.
//!
//! The receiving relay reads whatever text ends up in its fragment, so
//! decoding must be total (never panic) and must agree between plain and
//! percent-encoded renderings of the same envelope.

use framelink_proto::{Envelope, Request, Sealed, compose_location, fragment_of};
use proptest::prelude::*;

fn field() -> impl Strategy<Value = String> {
    "[A-Za-z0-9:/._%# -]{1,24}"
}

fn arbitrary_envelope() -> impl Strategy<Value = Envelope> {
    prop_oneof![
        (field(), field(), field(), field()).prop_map(|(na, uria, origin_id, target_name)| {
            Envelope::Request(Request { na, uria, origin_id, target_name })
        }),
        (field(), field(), any::<i64>(), ".{0,16}").prop_map(|(na, nb, n, s)| {
            let message = serde_json::json!({ "n": n, "s": s });
            Envelope::Message(Sealed { na, nb, message })
        }),
    ]
}

/// Percent-encode every byte outside the unreserved set, as a browser would
/// when it rewrites a fragment.
fn encode_like_host(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 3);
    for byte in text.bytes() {
        if byte.is_ascii_alphanumeric() || b"-_.~:,{}[]".contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

proptest! {
    #[test]
    fn prop_location_fragment_decodes_to_same_envelope(envelope in arbitrary_envelope()) {
        let location = compose_location("https://b.example/proxy.html", &envelope)?;
        let decoded = Envelope::from_fragment(fragment_of(&location))?;
        prop_assert_eq!(decoded, envelope);
    }

    #[test]
    fn prop_percent_encoded_fragment_decodes_to_same_envelope(envelope in arbitrary_envelope()) {
        let text = envelope.encode()?;
        let encoded = encode_like_host(&text);
        prop_assert!(encoded.starts_with("{%22"), "encoded fragment: {}", encoded);

        let decoded = Envelope::from_fragment(&format!("#{encoded}"))?;
        prop_assert_eq!(decoded, envelope);
    }

    #[test]
    fn prop_arbitrary_fragment_never_panics(raw in ".{0,256}") {
        let _ = Envelope::from_fragment(&raw);
    }
}
