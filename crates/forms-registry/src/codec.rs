// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed-value codec for response payloads.
//!
//! Responses travel as opaque bytes. The question's [`ResponseType`] decides how
//! those bytes map to a logical [`ResponseValue`]:
//!
//! | Tag | Type      | Wire form                                   |
//! |-----|-----------|---------------------------------------------|
//! | 0   | `Numeric` | `u64`, exactly 8 bytes, big-endian          |
//! | 1   | `Text`    | raw UTF-8 bytes, no padding or length prefix |
//! | *   | `Opaque`  | passed through unchanged, never rejected    |
//!
//! Unrecognized tags are preserved as [`ResponseType::Opaque`] so that a form
//! declared with a newer type still accepts (and returns) raw payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Width in bytes of an encoded numeric response.
pub const NUMERIC_WIDTH: usize = 8;

/// Declared response type of a question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ResponseType {
    /// Non-negative integer, fixed-width big-endian.
    Numeric,
    /// UTF-8 text.
    Text,
    /// Any other tag; payloads pass through as raw bytes.
    Opaque(u8),
}

impl ResponseType {
    /// Wire tag for [`ResponseType::Numeric`].
    pub const NUMERIC_TAG: u8 = 0;
    /// Wire tag for [`ResponseType::Text`].
    pub const TEXT_TAG: u8 = 1;

    /// Map a wire tag to its response type.
    pub const fn from_tag(tag: u8) -> Self {
        match tag {
            Self::NUMERIC_TAG => Self::Numeric,
            Self::TEXT_TAG => Self::Text,
            other => Self::Opaque(other),
        }
    }

    /// Wire tag of this response type.
    pub const fn tag(self) -> u8 {
        match self {
            Self::Numeric => Self::NUMERIC_TAG,
            Self::Text => Self::TEXT_TAG,
            Self::Opaque(tag) => tag,
        }
    }

    /// Returns `true` for types the codec validates (numeric and text).
    pub const fn is_recognized(self) -> bool {
        !matches!(self, Self::Opaque(_))
    }

    /// Returns `true` if [`decode`] under this type can yield `value`.
    pub const fn admits(self, value: &ResponseValue) -> bool {
        match value {
            ResponseValue::Numeric(_) => matches!(self, Self::Numeric),
            ResponseValue::Text(_) => matches!(self, Self::Text),
            ResponseValue::Opaque(_) => !self.is_recognized(),
        }
    }
}

impl From<u8> for ResponseType {
    fn from(tag: u8) -> Self {
        Self::from_tag(tag)
    }
}

impl From<ResponseType> for u8 {
    fn from(ty: ResponseType) -> Self {
        ty.tag()
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => f.write_str("numeric"),
            Self::Text => f.write_str("text"),
            Self::Opaque(tag) => write!(f, "opaque({tag})"),
        }
    }
}

impl FromStr for ResponseType {
    type Err = CodecError;

    /// Accepts `numeric`, `text` (any case) or a decimal wire tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("numeric") {
            return Ok(Self::Numeric);
        }
        if trimmed.eq_ignore_ascii_case("text") {
            return Ok(Self::Text);
        }
        trimmed
            .parse::<u8>()
            .map(Self::from_tag)
            .map_err(|_| CodecError::UnknownTypeName(trimmed.to_owned()))
    }
}

/// Logical value of a response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResponseValue {
    /// Non-negative integer.
    Numeric(u64),
    /// Text string.
    Text(String),
    /// Raw bytes of an unrecognized response type.
    Opaque(Vec<u8>),
}

impl ResponseValue {
    /// Short name of the value's dynamic kind (used in error messages).
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Text(_) => "text",
            Self::Opaque(_) => "opaque",
        }
    }
}

impl From<u64> for ResponseValue {
    fn from(n: u64) -> Self {
        Self::Numeric(n)
    }
}

impl From<&str> for ResponseValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for ResponseValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for ResponseValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Opaque(bytes)
    }
}

impl fmt::Display for ResponseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Opaque(bytes) => write!(f, "0x{}", hex::encode(bytes)),
        }
    }
}

/// Errors produced by [`encode`] and [`decode`].
///
/// Every variant except [`CodecError::UnknownTypeName`] is an invalid value
/// kind for a recognized response type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The value's kind cannot be represented under the declared type.
    #[error("[FORMS_INVALID_VALUE_KIND] {found} value cannot be encoded as {expected}")]
    ValueKind {
        /// Declared response type.
        expected: ResponseType,
        /// Kind of the value that was supplied.
        found: &'static str,
    },
    /// A numeric payload was not exactly [`NUMERIC_WIDTH`] bytes.
    #[error("[FORMS_INVALID_VALUE_KIND] numeric payload must be {NUMERIC_WIDTH} bytes, got {len}")]
    NumericWidth {
        /// Length of the rejected payload.
        len: usize,
    },
    /// A text payload was not valid UTF-8.
    #[error("[FORMS_INVALID_VALUE_KIND] text payload is not valid utf-8")]
    InvalidUtf8,
    /// A response type name could not be parsed.
    #[error("[FORMS_UNKNOWN_RESPONSE_TYPE] unknown response type {0:?}")]
    UnknownTypeName(String),
}

/// Encode a logical value into its wire bytes under `ty`.
///
/// `Numeric` accepts a numeric value or text holding a decimal `u64`. `Text`
/// accepts only text. Under an unrecognized type nothing is rejected: numbers
/// become 8 big-endian bytes, text its UTF-8 bytes, raw bytes stay as they are.
pub fn encode(value: &ResponseValue, ty: ResponseType) -> Result<Vec<u8>, CodecError> {
    match (ty, value) {
        (ResponseType::Numeric | ResponseType::Opaque(_), ResponseValue::Numeric(n)) => {
            Ok(n.to_be_bytes().to_vec())
        }
        (ResponseType::Numeric, ResponseValue::Text(text)) => text
            .trim()
            .parse::<u64>()
            .map(|n| n.to_be_bytes().to_vec())
            .map_err(|_| CodecError::ValueKind {
                expected: ty,
                found: value.kind_name(),
            }),
        (ResponseType::Text | ResponseType::Opaque(_), ResponseValue::Text(text)) => {
            Ok(text.as_bytes().to_vec())
        }
        (ResponseType::Opaque(_), ResponseValue::Opaque(bytes)) => Ok(bytes.clone()),
        (ResponseType::Numeric | ResponseType::Text, _) => Err(CodecError::ValueKind {
            expected: ty,
            found: value.kind_name(),
        }),
    }
}

/// Decode wire bytes into a logical value under `ty`.
pub fn decode(bytes: &[u8], ty: ResponseType) -> Result<ResponseValue, CodecError> {
    match ty {
        ResponseType::Numeric => {
            let raw: [u8; NUMERIC_WIDTH] = bytes
                .try_into()
                .map_err(|_| CodecError::NumericWidth { len: bytes.len() })?;
            Ok(ResponseValue::Numeric(u64::from_be_bytes(raw)))
        }
        ResponseType::Text => std::str::from_utf8(bytes)
            .map(|s| ResponseValue::Text(s.to_owned()))
            .map_err(|_| CodecError::InvalidUtf8),
        ResponseType::Opaque(_) => Ok(ResponseValue::Opaque(bytes.to_vec())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn numeric_is_eight_bytes_big_endian() {
        let bytes = encode(&ResponseValue::Numeric(46), ResponseType::Numeric).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 0, 46]);
        assert_eq!(
            decode(&bytes, ResponseType::Numeric).unwrap(),
            ResponseValue::Numeric(46)
        );
    }

    #[test]
    fn numeric_accepts_decimal_text() {
        let bytes = encode(&ResponseValue::from(" 24 "), ResponseType::Numeric).unwrap();
        assert_eq!(bytes, 24u64.to_be_bytes().to_vec());
    }

    #[test]
    fn numeric_rejects_non_numeric_text() {
        let err = encode(&ResponseValue::from("Answer 1"), ResponseType::Numeric).unwrap_err();
        assert_eq!(
            err,
            CodecError::ValueKind {
                expected: ResponseType::Numeric,
                found: "text"
            }
        );
    }

    #[test]
    fn numeric_decode_requires_exact_width() {
        assert_eq!(
            decode(&[1, 2, 3], ResponseType::Numeric),
            Err(CodecError::NumericWidth { len: 3 })
        );
        assert_eq!(
            decode(&[0; 9], ResponseType::Numeric),
            Err(CodecError::NumericWidth { len: 9 })
        );
    }

    #[test]
    fn text_is_raw_utf8() {
        let bytes = encode(&ResponseValue::from("Answer 1"), ResponseType::Text).unwrap();
        assert_eq!(bytes, b"Answer 1".to_vec());
        assert_eq!(
            decode(&bytes, ResponseType::Text).unwrap(),
            ResponseValue::from("Answer 1")
        );
    }

    #[test]
    fn text_rejects_numbers_and_invalid_utf8() {
        assert!(encode(&ResponseValue::Numeric(1), ResponseType::Text).is_err());
        assert_eq!(
            decode(&[0xff, 0xfe], ResponseType::Text),
            Err(CodecError::InvalidUtf8)
        );
    }

    #[test]
    fn opaque_passes_everything_through() {
        let ty = ResponseType::Opaque(7);
        let raw = vec![0xff, 0x00, 0x10];
        assert_eq!(
            encode(&ResponseValue::Opaque(raw.clone()), ty).unwrap(),
            raw
        );
        assert_eq!(decode(&raw, ty).unwrap(), ResponseValue::Opaque(raw));
        assert_eq!(encode(&ResponseValue::from("hi"), ty).unwrap(), b"hi".to_vec());
        assert_eq!(
            encode(&ResponseValue::Numeric(1), ty).unwrap(),
            1u64.to_be_bytes().to_vec()
        );
    }

    #[test]
    fn recognized_types_reject_opaque_values() {
        let value = ResponseValue::Opaque(vec![1]);
        assert!(encode(&value, ResponseType::Numeric).is_err());
        assert!(encode(&value, ResponseType::Text).is_err());
    }

    #[test]
    fn tags_round_trip() {
        for tag in 0..=u8::MAX {
            assert_eq!(ResponseType::from_tag(tag).tag(), tag);
        }
        assert!(ResponseType::Numeric.is_recognized());
        assert!(!ResponseType::Opaque(2).is_recognized());
        assert!(ResponseType::Numeric.admits(&ResponseValue::Numeric(1)));
        assert!(!ResponseType::Numeric.admits(&ResponseValue::Text("1".into())));
        assert!(!ResponseType::Text.admits(&ResponseValue::Opaque(vec![1])));
        assert!(ResponseType::Opaque(2).admits(&ResponseValue::Opaque(vec![1])));
        assert!(!ResponseType::Opaque(2).admits(&ResponseValue::Numeric(1)));
    }

    #[test]
    fn type_names_parse() {
        assert_eq!("Numeric".parse::<ResponseType>().unwrap(), ResponseType::Numeric);
        assert_eq!("text".parse::<ResponseType>().unwrap(), ResponseType::Text);
        assert_eq!("9".parse::<ResponseType>().unwrap(), ResponseType::Opaque(9));
        assert!("date".parse::<ResponseType>().is_err());
    }
}
