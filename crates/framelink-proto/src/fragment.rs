//! Relay locations and fragment text.
//!
//! A relay location is `<proxy document>#<envelope text>`. Some hosts hand
//! the fragment back percent-encoded (`{%22stage%22:...}`), others verbatim;
//! [`normalize_fragment`] folds both into plain envelope text.

use std::borrow::Cow;

use crate::{
    envelope::Envelope,
    errors::{Result, WireError},
};

/// Build the location a relay is navigated to: `base#<envelope>`.
///
/// Any fragment already on `base` is dropped.
pub fn compose_location(base: &str, envelope: &Envelope) -> Result<String> {
    Ok(format!("{}#{}", strip_fragment(base), envelope.encode()?))
}

/// Location without its fragment.
#[must_use]
pub fn strip_fragment(location: &str) -> &str {
    location.split_once('#').map_or(location, |(base, _)| base)
}

/// Fragment text of a location (everything after the first `#`), or `""`.
#[must_use]
pub fn fragment_of(location: &str) -> &str {
    location.split_once('#').map_or("", |(_, fragment)| fragment)
}

/// Strip leading `#` characters and undo host percent-encoding.
///
/// Only text that starts like an encoded JSON object (`{%22` or `%7B`) is
/// decoded. Plain JSON may legitimately contain `%` inside string values and
/// is passed through untouched.
pub fn normalize_fragment(raw: &str) -> Result<Cow<'_, str>> {
    let text = raw.trim_start_matches('#');

    let encoded = text.starts_with("{%22")
        || text.get(..3).is_some_and(|prefix| prefix.eq_ignore_ascii_case("%7b"));

    if encoded { percent_decode(text).map(Cow::Owned) } else { Ok(Cow::Borrowed(text)) }
}

fn percent_decode(text: &str) -> Result<String> {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = bytes.get(i + 1).and_then(|b| hex_value(*b));
            let lo = bytes.get(i + 2).and_then(|b| hex_value(*b));
            let (Some(hi), Some(lo)) = (hi, lo) else {
                return Err(WireError::PercentEncoding);
            };
            decoded.push((hi << 4) | lo);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(decoded).map_err(|_| WireError::PercentEncoding)
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Confirm;

    #[test]
    fn compose_replaces_existing_fragment() {
        let envelope = Envelope::Confirm(Confirm { nb: "x".to_string() });
        let location = compose_location("https://b.example/proxy.html#old", &envelope).unwrap();
        assert_eq!(location, r#"https://b.example/proxy.html#{"stage":3,"NB":"x"}"#);
    }

    #[test]
    fn fragment_helpers() {
        assert_eq!(strip_fragment("https://a.example/p#x#y"), "https://a.example/p");
        assert_eq!(strip_fragment("https://a.example/p"), "https://a.example/p");
        assert_eq!(fragment_of("https://a.example/p#x#y"), "x#y");
        assert_eq!(fragment_of("https://a.example/p"), "");
    }

    #[test]
    fn plain_text_is_borrowed() {
        let text = normalize_fragment(r#"#{"stage":3,"NB":"50%"}"#).unwrap();
        assert!(matches!(text, Cow::Borrowed(_)));
        assert_eq!(text, r#"{"stage":3,"NB":"50%"}"#);
    }

    #[test]
    fn safari_style_encoding_is_decoded() {
        let text = normalize_fragment("{%22stage%22:3,%22NB%22:%22x%22}").unwrap();
        assert_eq!(text, r#"{"stage":3,"NB":"x"}"#);
    }

    #[test]
    fn fully_encoded_object_is_decoded() {
        let text = normalize_fragment("%7B%22stage%22%3A3%7D").unwrap();
        assert_eq!(text, r#"{"stage":3}"#);
    }

    #[test]
    fn broken_escape_is_rejected() {
        assert_eq!(normalize_fragment("{%22stage%2"), Err(WireError::PercentEncoding));
        assert_eq!(normalize_fragment("{%22%FF%22}"), Err(WireError::PercentEncoding));
    }
}
