//! Origin derivation.
//!
//! An origin is the `scheme://authority` prefix of a location. It is the
//! unit of authentication for the whole protocol: a nonce is only trusted
//! when it arrives paired with the origin the endpoint expected at
//! construction time. Frame handles are never trusted on their own.

use std::fmt;

use thiserror::Error;

/// Location string does not start with `scheme://authority`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("location {location:?} has no scheme://authority prefix")]
pub struct OriginError {
    /// The offending location
    pub location: String,
}

/// Security principal of a frame: `scheme://host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Origin(String);

impl Origin {
    /// Derive the origin of a location.
    ///
    /// The scheme is one or more word characters (`[A-Za-z0-9_]`), followed
    /// by `://` and a non-empty authority that ends at the first `/`, `?` or
    /// `#`.
    pub fn from_location(location: &str) -> Result<Self, OriginError> {
        let malformed = || OriginError { location: location.to_string() };

        let scheme_len =
            location.bytes().take_while(|b| b.is_ascii_alphanumeric() || *b == b'_').count();
        if scheme_len == 0 {
            return Err(malformed());
        }

        let rest = location[scheme_len..].strip_prefix("://").ok_or_else(malformed)?;
        let authority_len = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        if authority_len == 0 {
            return Err(malformed());
        }

        let end = scheme_len + "://".len() + authority_len;
        Ok(Self(location[..end].to_string()))
    }

    /// Origin text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Origin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(location: &str) -> String {
        Origin::from_location(location).unwrap().to_string()
    }

    #[test]
    fn strips_path_query_and_fragment() {
        assert_eq!(origin("https://b.example/proxy.html"), "https://b.example");
        assert_eq!(origin("https://b.example:8443/a/b?c=d#e"), "https://b.example:8443");
        assert_eq!(origin("http://b.example?x"), "http://b.example");
        assert_eq!(origin("http://b.example#{\"stage\":1}"), "http://b.example");
        assert_eq!(origin("https://b.example"), "https://b.example");
    }

    #[test]
    fn userinfo_stays_in_authority() {
        assert_eq!(origin("ftp://user@host.example/file"), "ftp://user@host.example");
    }

    #[test]
    fn rejects_malformed() {
        let malformed = [
            "",
            "b.example/proxy.html",
            "://b.example",
            "https://",
            "https:///path",
            "about:blank",
            "-x://y",
        ];
        for location in malformed {
            assert!(Origin::from_location(location).is_err(), "{location} should be rejected");
        }
    }

    #[test]
    fn error_names_location() {
        let err = Origin::from_location("about:blank").unwrap_err();
        assert_eq!(err.location, "about:blank");
    }
}
