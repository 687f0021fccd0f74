//! Scalar parsing from text, shared by the XML reader and header binding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use wireshape_core::{ScalarKind, UnmarshallingError, Value};

use crate::timestamp;

/// Parse a scalar wire string into a value of the given kind.
///
/// Strings are taken verbatim; all other kinds tolerate surrounding
/// whitespace from document formatting.
pub(crate) fn scalar_from_text(
    text: &str,
    kind: ScalarKind,
    path: &str,
) -> Result<Value, UnmarshallingError> {
    let mismatch = |expected: &'static str| UnmarshallingError::TypeMismatch {
        path: path.to_owned(),
        expected,
    };

    match kind {
        ScalarKind::String => Ok(Value::from(text)),
        ScalarKind::Integer | ScalarKind::Long => {
            let trimmed = text.trim();
            if let Ok(v) = trimmed.parse::<i64>() {
                Ok(Value::from(v))
            } else if let Ok(v) = trimmed.parse::<u64>() {
                Ok(Value::from(v))
            } else {
                Err(mismatch("integer"))
            }
        }
        ScalarKind::Float | ScalarKind::Double => text
            .trim()
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| mismatch("number")),
        ScalarKind::Boolean => match text.trim() {
            "true" => Ok(Value::from(true)),
            "false" => Ok(Value::from(false)),
            _ => Err(mismatch("boolean")),
        },
        ScalarKind::Blob => BASE64
            .decode(text.trim())
            .map(|bytes| Value::Blob(bytes.into()))
            .map_err(|_| mismatch("base64 string")),
        ScalarKind::Timestamp => {
            let trimmed = text.trim();
            if let Some(dt) = timestamp::parse_iso8601(trimmed) {
                Ok(Value::from(dt))
            } else if let Ok(seconds) = trimmed.parse::<f64>() {
                timestamp::from_epoch_seconds(seconds)
                    .map(Value::from)
                    .ok_or_else(|| mismatch("timestamp"))
            } else {
                Err(mismatch("timestamp"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_keeps_whitespace() {
        let parsed = scalar_from_text("  padded  ", ScalarKind::String, "$").unwrap();
        assert_eq!(parsed.as_str(), Some("  padded  "));
    }

    #[test]
    fn test_numbers_tolerate_whitespace() {
        assert_eq!(
            scalar_from_text(" 42 ", ScalarKind::Integer, "$").unwrap(),
            Value::from(42i64)
        );
        assert_eq!(
            scalar_from_text("1.5", ScalarKind::Double, "$").unwrap(),
            Value::from(1.5f64)
        );
    }

    #[test]
    fn test_boolean_is_strict() {
        assert_eq!(
            scalar_from_text("true", ScalarKind::Boolean, "$").unwrap(),
            Value::from(true)
        );
        assert!(scalar_from_text("TRUE", ScalarKind::Boolean, "$").is_err());
    }

    #[test]
    fn test_timestamp_accepts_both_formats() {
        let iso = scalar_from_text("2019-12-16T23:48:18Z", ScalarKind::Timestamp, "$").unwrap();
        let epoch = scalar_from_text("1576540098", ScalarKind::Timestamp, "$").unwrap();
        assert_eq!(iso, epoch);
    }
}
