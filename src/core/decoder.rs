//! Reading decoder: raw pub/sub payload → Reading
//!
//! Empty and whitespace-only payloads are "no message" (`Ok(None)`), not
//! errors. Anything else that is not a record with a usable `weight` is a
//! `DecodeError` and must not reach the engine.

use crate::error::DecodeError;
use crate::types::{Reading, ScaleMessage};

const BOM: char = '\u{feff}';

/// Decode one payload as published by the scale
pub fn decode_payload(payload: &[u8]) -> Result<Option<Reading>, DecodeError> {
    let text = std::str::from_utf8(payload)?;
    let text = text.strip_prefix(BOM).unwrap_or(text);
    if text.trim().is_empty() {
        return Ok(None);
    }

    let message: ScaleMessage = serde_json::from_str(text)?;
    Reading::try_from(message).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_number() {
        let reading = decode_payload(br#"{"weight": 10.02}"#).unwrap();
        assert_eq!(reading, Some(Reading::new(10.02)));
    }

    #[test]
    fn test_decode_integer() {
        let reading = decode_payload(br#"{"weight": 7}"#).unwrap();
        assert_eq!(reading, Some(Reading::new(7.0)));
    }

    #[test]
    fn test_decode_pascal_case_field() {
        let reading = decode_payload(br#"{"Weight": 3.5, "Unit": "kg"}"#).unwrap();
        assert_eq!(reading, Some(Reading::new(3.5)));
    }

    #[test]
    fn test_decode_string_weight() {
        let reading = decode_payload(br#"{"weight": "4.25"}"#).unwrap();
        assert_eq!(reading, Some(Reading::new(4.25)));
    }

    #[test]
    fn test_empty_payload_is_no_message() {
        assert_eq!(decode_payload(b"").unwrap(), None);
        assert_eq!(decode_payload(b"  \r\n\t").unwrap(), None);
    }

    #[test]
    fn test_bom_is_ignored() {
        let payload = "\u{feff}{\"weight\": 1.5}".as_bytes();
        assert_eq!(decode_payload(payload).unwrap(), Some(Reading::new(1.5)));
        assert_eq!(decode_payload("\u{feff}".as_bytes()).unwrap(), None);
    }

    #[test]
    fn test_invalid_json() {
        let err = decode_payload(b"weight=5").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidJson(_)));
    }

    #[test]
    fn test_missing_weight() {
        let err = decode_payload(br#"{"unit": "kg"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidJson(_)));
    }

    #[test]
    fn test_null_record() {
        let err = decode_payload(b"null").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidJson(_)));
    }

    #[test]
    fn test_invalid_utf8() {
        let err = decode_payload(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidUtf8(_)));
    }
}
