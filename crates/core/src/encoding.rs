//! Wire encodings for entity payloads.
//!
//! Payloads travel over text transports, so an entity records how its `data`
//! is encoded:
//!
//! | Encoding | Payload variant | Contents |
//! |---|---|---|
//! | `RawBytes` | [`Payload::Bytes`] | the file bytes unchanged |
//! | `Base64` | [`Payload::Text`] | the file bytes as a base64 string |
//! | `Base64AsciiBytes` | [`Payload::Bytes`] | the ASCII bytes of that base64 string |
//!
//! `Base64AsciiBytes` exists for transports that must carry the encoded form as
//! a byte array rather than a string.

use crate::error::{RepositoryError, RepositoryResult};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an entity's payload is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadEncoding {
    #[default]
    RawBytes,
    Base64,
    Base64AsciiBytes,
}

/// An entity payload as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
}

impl Payload {
    /// Payload contents as bytes, without decoding.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Bytes(bytes) => bytes,
        }
    }

    /// Length of the payload as carried, without decoding.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PayloadEncoding {
    /// Encodes raw file bytes into the payload form for this encoding.
    pub fn encode(self, raw: Vec<u8>) -> Payload {
        match self {
            PayloadEncoding::RawBytes => Payload::Bytes(raw),
            PayloadEncoding::Base64 => Payload::Text(general_purpose::STANDARD.encode(raw)),
            PayloadEncoding::Base64AsciiBytes => {
                Payload::Bytes(general_purpose::STANDARD.encode(raw).into_bytes())
            }
        }
    }

    /// Decodes a payload back into raw file bytes.
    ///
    /// Either payload variant is accepted for every encoding: a raw-bytes
    /// payload that arrived as text is taken as its UTF-8 bytes, and a base64
    /// payload that arrived as bytes is taken as ASCII.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidArgument` if a base64 payload is malformed.
    pub fn decode(self, payload: &Payload) -> RepositoryResult<Vec<u8>> {
        match self {
            PayloadEncoding::RawBytes => Ok(payload.as_bytes().to_vec()),
            PayloadEncoding::Base64 | PayloadEncoding::Base64AsciiBytes => general_purpose::STANDARD
                .decode(payload.as_bytes())
                .map_err(|e| {
                    RepositoryError::InvalidArgument(format!(
                        "payload is not valid {} data: {}",
                        self, e
                    ))
                }),
        }
    }

    /// Stable identifier used in configuration and predicates.
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadEncoding::RawBytes => "raw_bytes",
            PayloadEncoding::Base64 => "base64",
            PayloadEncoding::Base64AsciiBytes => "base64_ascii_bytes",
        }
    }
}

impl fmt::Display for PayloadEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadEncoding {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "raw" | "raw_bytes" | "bytes" => Ok(PayloadEncoding::RawBytes),
            "base64" => Ok(PayloadEncoding::Base64),
            "base64_ascii_bytes" | "base64_ascii" => Ok(PayloadEncoding::Base64AsciiBytes),
            other => Err(RepositoryError::InvalidArgument(format!(
                "unknown payload encoding: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_expected_variants() {
        let raw = b"hi!".to_vec();

        assert_eq!(
            PayloadEncoding::RawBytes.encode(raw.clone()),
            Payload::Bytes(b"hi!".to_vec())
        );
        assert_eq!(
            PayloadEncoding::Base64.encode(raw.clone()),
            Payload::Text("aGkh".into())
        );
        assert_eq!(
            PayloadEncoding::Base64AsciiBytes.encode(raw),
            Payload::Bytes(b"aGkh".to_vec())
        );
    }

    #[test]
    fn test_decode_accepts_either_variant() {
        assert_eq!(
            PayloadEncoding::Base64
                .decode(&Payload::Bytes(b"aGkh".to_vec()))
                .unwrap(),
            b"hi!"
        );
        assert_eq!(
            PayloadEncoding::RawBytes
                .decode(&Payload::Text("plain".into()))
                .unwrap(),
            b"plain"
        );
    }

    #[test]
    fn test_decode_rejects_malformed_base64() {
        let result = PayloadEncoding::Base64.decode(&Payload::Text("not base64!!".into()));
        assert!(matches!(result, Err(RepositoryError::InvalidArgument(_))));
    }

    #[test]
    fn test_parse_encoding_names() {
        assert_eq!("raw".parse::<PayloadEncoding>().unwrap(), PayloadEncoding::RawBytes);
        assert_eq!(" Base64 ".parse::<PayloadEncoding>().unwrap(), PayloadEncoding::Base64);
        assert_eq!(
            "base64-ascii-bytes".parse::<PayloadEncoding>().unwrap(),
            PayloadEncoding::Base64AsciiBytes
        );
        assert!("utf16".parse::<PayloadEncoding>().is_err());
    }

    #[test]
    fn test_payload_wire_format() {
        let text: Payload = serde_json::from_str("\"aGkh\"").unwrap();
        assert_eq!(text, Payload::Text("aGkh".into()));

        let bytes: Payload = serde_json::from_str("[104, 105]").unwrap();
        assert_eq!(bytes, Payload::Bytes(vec![104, 105]));

        assert_eq!(
            serde_json::to_string(&PayloadEncoding::Base64AsciiBytes).unwrap(),
            "\"base64_ascii_bytes\""
        );
    }
}
