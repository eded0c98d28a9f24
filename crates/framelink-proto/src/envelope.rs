//! Stage envelopes.
//!
//! Each stage body is a plain struct; the `stage` discriminator is added on
//! encode and read back on decode, so the bodies never carry it themselves.
//! Field names on the wire (`NA`, `URIA`, `originID`, ...) are fixed by the
//! protocol and differ from the Rust field names.
//!
//! # Invariants
//!
//! - Every decoded envelope has all required string fields non-empty. An
//!   empty nonce is indistinguishable from an absent one and is rejected.
//! - `decode(encode(e)) == e` for every envelope whose fields are non-empty.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    errors::{Result, WireError},
    fragment::normalize_fragment,
};

/// Handshake stage carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Initiator to responder, on relay load
    Request = 1,
    /// Responder to initiator, via a disposable relay
    Response = 2,
    /// Initiator to responder, on relay resize
    Confirm = 3,
    /// Application message over an authenticated relay
    Message = 4,
}

impl Stage {
    /// Numeric stage as written on the wire.
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    fn from_number(stage: u64) -> Result<Self> {
        match stage {
            1 => Ok(Self::Request),
            2 => Ok(Self::Response),
            3 => Ok(Self::Confirm),
            4 => Ok(Self::Message),
            other => Err(WireError::UnknownStage(other)),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {}", self.number())
    }
}

/// Stage 1: `{NA, URIA, originID, targetName}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Initiator nonce
    #[serde(rename = "NA")]
    pub na: String,
    /// Initiator's proxy document location
    #[serde(rename = "URIA")]
    pub uria: String,
    /// Identity of the initiating endpoint
    #[serde(rename = "originID")]
    pub origin_id: String,
    /// Logical name of the frame the channel targets
    #[serde(rename = "targetName")]
    pub target_name: String,
}

/// Stage 2: `{NA, NB, URIB, originID}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Initiator nonce, echoed
    #[serde(rename = "NA")]
    pub na: String,
    /// Responder nonce
    #[serde(rename = "NB")]
    pub nb: String,
    /// Responder location with the fragment stripped
    #[serde(rename = "URIB")]
    pub urib: String,
    /// Identity of the initiating endpoint, echoed
    #[serde(rename = "originID")]
    pub origin_id: String,
}

/// Stage 3: `{NB}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirm {
    /// Responder nonce, echoed back
    #[serde(rename = "NB")]
    pub nb: String,
}

/// Stage 4: `{NA, NB, message}`.
///
/// `message` is any JSON value. A missing `message` decodes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sealed {
    /// Initiator nonce
    #[serde(rename = "NA")]
    pub na: String,
    /// Responder nonce
    #[serde(rename = "NB")]
    pub nb: String,
    /// Application payload
    #[serde(default)]
    pub message: Value,
}

impl Sealed {
    /// Seal an application value under the nonce pair.
    ///
    /// Fails with [`WireError::Encode`] if `message` has no JSON form (for
    /// example a map with non-string keys).
    pub fn new<T: Serialize + ?Sized>(na: &str, nb: &str, message: &T) -> Result<Self> {
        let message =
            serde_json::to_value(message).map_err(|e| WireError::Encode(e.to_string()))?;
        Ok(Self { na: na.to_string(), nb: nb.to_string(), message })
    }
}

/// Any envelope that can appear in a relay fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Stage 1
    Request(Request),
    /// Stage 2
    Response(Response),
    /// Stage 3
    Confirm(Confirm),
    /// Stage 4
    Message(Sealed),
}

/// Serialization wrapper putting `stage` first, ahead of the body fields.
#[derive(Serialize)]
struct Tagged<'a, T> {
    stage: u8,
    #[serde(flatten)]
    body: &'a T,
}

impl Envelope {
    /// Stage of this envelope.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Request(_) => Stage::Request,
            Self::Response(_) => Stage::Response,
            Self::Confirm(_) => Stage::Confirm,
            Self::Message(_) => Stage::Message,
        }
    }

    /// Encode as fragment text (JSON, `stage` first).
    pub fn encode(&self) -> Result<String> {
        let stage = self.stage().number();
        let text = match self {
            Self::Request(body) => serde_json::to_string(&Tagged { stage, body }),
            Self::Response(body) => serde_json::to_string(&Tagged { stage, body }),
            Self::Confirm(body) => serde_json::to_string(&Tagged { stage, body }),
            Self::Message(body) => serde_json::to_string(&Tagged { stage, body }),
        };

        text.map_err(|e| WireError::Encode(e.to_string()))
    }

    /// Decode envelope text that has already been normalized.
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let stage = value.get("stage").and_then(Value::as_u64).ok_or(WireError::MissingStage)?;

        let envelope = match Stage::from_number(stage)? {
            Stage::Request => Self::Request(serde_json::from_value(value)?),
            Stage::Response => Self::Response(serde_json::from_value(value)?),
            Stage::Confirm => Self::Confirm(serde_json::from_value(value)?),
            Stage::Message => Self::Message(serde_json::from_value(value)?),
        };

        envelope.validate()?;
        Ok(envelope)
    }

    /// Decode raw fragment text as read from a relay location.
    ///
    /// Strips leading `#` and undoes host percent-encoding first.
    pub fn from_fragment(raw: &str) -> Result<Self> {
        let text = normalize_fragment(raw)?;
        Self::decode(&text)
    }

    fn validate(&self) -> Result<()> {
        let stage = self.stage().number();
        let require = |field: &'static str, value: &str| {
            if value.is_empty() { Err(WireError::EmptyField { stage, field }) } else { Ok(()) }
        };

        match self {
            Self::Request(r) => {
                require("NA", &r.na)?;
                require("URIA", &r.uria)?;
                require("originID", &r.origin_id)?;
                require("targetName", &r.target_name)
            },
            Self::Response(r) => {
                require("NA", &r.na)?;
                require("NB", &r.nb)?;
                require("URIB", &r.urib)?;
                require("originID", &r.origin_id)
            },
            Self::Confirm(c) => require("NB", &c.nb),
            Self::Message(m) => {
                require("NA", &m.na)?;
                require("NB", &m.nb)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request() -> Request {
        Request {
            na: "n1".to_string(),
            uria: "https://a.example/proxy.html".to_string(),
            origin_id: "id-1".to_string(),
            target_name: "frame-b".to_string(),
        }
    }

    const REQUEST_TEXT: &str = concat!(
        r#"{"stage":1,"NA":"n1","URIA":"https://a.example/proxy.html","#,
        r#""originID":"id-1","targetName":"frame-b"}"#,
    );

    #[test]
    fn request_wire_text_puts_stage_first() {
        let text = Envelope::Request(request()).encode().unwrap();
        assert_eq!(text, REQUEST_TEXT);
    }

    #[test]
    fn sealed_wire_text() {
        let sealed = Sealed::new("n1", "n2", "hello").unwrap();
        let text = Envelope::Message(sealed).encode().unwrap();
        insta::assert_snapshot!(text, @r#"{"stage":4,"NA":"n1","NB":"n2","message":"hello"}"#);
    }

    #[test]
    fn decode_request() {
        assert_eq!(Envelope::decode(REQUEST_TEXT).unwrap(), Envelope::Request(request()));
    }

    #[test]
    fn decode_message_without_payload_is_null() {
        let envelope = Envelope::decode(r#"{"stage":4,"NA":"a","NB":"b"}"#).unwrap();
        match envelope {
            Envelope::Message(sealed) => assert_eq!(sealed.message, Value::Null),
            other => panic!("expected message envelope, got {other:?}"),
        }
    }

    #[test]
    fn decode_structured_message() {
        let text = r#"{"stage":4,"NA":"a","NB":"b","message":{"kind":"ping","seq":[1,2]}}"#;
        let Envelope::Message(sealed) = Envelope::decode(text).unwrap() else {
            panic!("expected message envelope");
        };
        assert_eq!(sealed.message, json!({"kind": "ping", "seq": [1, 2]}));
    }

    #[test]
    fn decode_rejects_missing_stage() {
        assert_eq!(Envelope::decode(r#"{"NB":"x"}"#), Err(WireError::MissingStage));
        assert_eq!(Envelope::decode("5"), Err(WireError::MissingStage));
        assert_eq!(Envelope::decode(r#"{"stage":"3","NB":"x"}"#), Err(WireError::MissingStage));
    }

    #[test]
    fn decode_rejects_unknown_stage() {
        assert_eq!(Envelope::decode(r#"{"stage":0}"#), Err(WireError::UnknownStage(0)));
        assert_eq!(Envelope::decode(r#"{"stage":5,"NB":"x"}"#), Err(WireError::UnknownStage(5)));
    }

    #[test]
    fn decode_rejects_missing_field() {
        let result = Envelope::decode(r#"{"stage":2,"NA":"a","NB":"b","originID":"o"}"#);
        assert!(matches!(result, Err(WireError::Malformed(_))));
    }

    #[test]
    fn decode_rejects_empty_field() {
        let result = Envelope::decode(r#"{"stage":3,"NB":""}"#);
        assert_eq!(result, Err(WireError::EmptyField { stage: 3, field: "NB" }));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(Envelope::decode("not json"), Err(WireError::Malformed(_))));
        assert!(matches!(Envelope::decode(""), Err(WireError::Malformed(_))));
    }

    #[test]
    fn sealed_rejects_unrepresentable_message() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(vec![1u8], "value");
        assert!(matches!(Sealed::new("a", "b", &map), Err(WireError::Encode(_))));
    }

    #[test]
    fn from_fragment_strips_hash() {
        let envelope = Envelope::from_fragment(r##"##{"stage":3,"NB":"x"}"##).unwrap();
        assert_eq!(envelope, Envelope::Confirm(Confirm { nb: "x".to_string() }));
    }
}
