//! Property-based tests for origin derivation.
//!
//! Origins are the unit of authentication, so derivation must be exact for
//! well-formed locations and must fail, never guess, for anything else.

use framelink_core::Origin;
use proptest::prelude::*;

fn scheme() -> impl Strategy<Value = String> {
    prop_oneof![Just("http".to_string()), Just("https".to_string()), "[a-z][a-z0-9_]{0,8}"]
}

fn host() -> impl Strategy<Value = String> {
    "[a-z0-9]([a-z0-9-]{0,12}[a-z0-9])?(\\.[a-z]{2,6}){0,3}"
}

fn port() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), (1u16..).prop_map(|p| format!(":{p}"))]
}

fn tail() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "/[ -~]{0,30}",
        "\\?[ -~]{0,20}",
        "#[ -~]{0,40}",
    ]
}

proptest! {
    /// `scheme://host[:port]` followed by any path, query or fragment
    /// derives exactly `scheme://host[:port]`.
    #[test]
    fn prop_derivation_is_exact(
        scheme in scheme(),
        host in host(),
        port in port(),
        tail in tail(),
    ) {
        let origin = format!("{scheme}://{host}{port}");
        let location = format!("{origin}{tail}");

        let derived = Origin::from_location(&location).unwrap();
        prop_assert_eq!(derived.as_str(), origin.as_str());
    }

    /// Derivation is idempotent.
    #[test]
    fn prop_origin_of_origin(scheme in scheme(), host in host(), port in port(), tail in tail()) {
        let once = Origin::from_location(&format!("{scheme}://{host}{port}{tail}")).unwrap();
        let twice = Origin::from_location(once.as_str()).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Text without `://` never yields an origin.
    #[test]
    fn prop_no_separator_fails(text in "[^:]{0,40}") {
        prop_assert!(Origin::from_location(&text).is_err());
    }

    /// Derivation never panics.
    #[test]
    fn prop_total(text in ".{0,80}") {
        let _ = Origin::from_location(&text);
    }
}
