//! Bidirectional field-value converters (component B, §4.B).

use crate::error::Error;
use crate::field::value::FieldValue;
use crate::token::Cursor;

/// A bidirectional converter between the on-wire text of a header value
/// and its typed [`FieldValue`] representation.
///
/// `as_field_value` is total: any value the converter can produce a
/// `FieldValue` for, it can also render. `from_field_value` is partial:
/// malformed wire text fails with [`Error::is_parse_error`].
pub trait Converter {
    fn as_field_value(&self, value: &FieldValue) -> Result<String, Error>;
    fn from_field_value(&self, text: &str) -> Result<FieldValue, Error>;
}

/// Characters that force a parameter value (or list item, under
/// composition) to be emitted as a quoted string (§4.B).
const NEEDS_QUOTING: &[u8] = b"\"(){}[]<>@,;:\\/?= \t";

fn needs_quoting(s: &str) -> bool {
    s.is_empty() || s.bytes().any(|b| NEEDS_QUOTING.contains(&b) || !b.is_ascii())
}

/// Escapes `"` and `\` for embedding inside a quoted string, and wraps
/// the result in `"..."`.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Renders `s` as a quoted string if it needs one under the §4.B quoting
/// policy, or returns it unquoted otherwise.
pub fn quote_if_needed(s: &str) -> String {
    if needs_quoting(s) {
        quote(s)
    } else {
        s.to_string()
    }
}

/// The plain string converter. `strict` selects between the two forms
/// §4.B names: `unquoted-string` (rejects values needing quoting) and
/// `quotable` (accepts and strips surrounding quotes on input).
#[derive(Debug, Clone, Copy)]
pub struct StringConverter {
    pub strict: bool,
}

impl StringConverter {
    pub fn unquoted() -> Self {
        StringConverter { strict: true }
    }

    pub fn quotable() -> Self {
        StringConverter { strict: false }
    }
}

impl Converter for StringConverter {
    fn as_field_value(&self, value: &FieldValue) -> Result<String, Error> {
        let s = value
            .as_str()
            .ok_or_else(|| Error::new_parse("expected a string field value"))?;
        if self.strict && needs_quoting(s) {
            return Err(Error::new_parse("unquoted-string contains characters requiring quoting"));
        }
        Ok(s.to_string())
    }

    fn from_field_value(&self, text: &str) -> Result<FieldValue, Error> {
        let trimmed = text.trim();
        if trimmed.starts_with('"') {
            let mut cursor = Cursor::new(trimmed.as_bytes());
            let unescaped = cursor.next_quoted_string()?;
            if !cursor.is_empty() {
                return Err(Error::new_parse("trailing data after quoted string"));
            }
            let s = String::from_utf8(unescaped).map_err(|_| Error::new_parse("quoted string is not valid UTF-8"))?;
            Ok(FieldValue::Str(s))
        } else if self.strict && needs_quoting(trimmed) {
            Err(Error::new_parse("unquoted-string contains characters requiring quoting"))
        } else {
            Ok(FieldValue::Str(trimmed.to_string()))
        }
    }
}

/// Converts a scalar `i64` to/from its decimal text form.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntConverter;

impl Converter for IntConverter {
    fn as_field_value(&self, value: &FieldValue) -> Result<String, Error> {
        let n = value.as_int().ok_or_else(|| Error::new_parse("expected an integer field value"))?;
        Ok(n.to_string())
    }

    fn from_field_value(&self, text: &str) -> Result<FieldValue, Error> {
        text.trim()
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| Error::new_parse("not a valid integer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquoted_round_trips_plain_token() {
        let c = StringConverter::unquoted();
        let v = c.from_field_value("gzip").unwrap();
        assert_eq!(c.as_field_value(&v).unwrap(), "gzip");
    }

    #[test]
    fn unquoted_rejects_special_chars() {
        let c = StringConverter::unquoted();
        assert!(c.from_field_value("a,b").is_err());
    }

    #[test]
    fn quotable_strips_and_unescapes() {
        let c = StringConverter::quotable();
        let v = c.from_field_value(r#""a\"b""#).unwrap();
        assert_eq!(v.as_str(), Some("a\"b"));
    }

    #[test]
    fn int_round_trips() {
        let c = IntConverter;
        let v = c.from_field_value(" 42 ").unwrap();
        assert_eq!(c.as_field_value(&v).unwrap(), "42");
    }

    #[test]
    fn quote_if_needed_only_quotes_when_necessary() {
        assert_eq!(quote_if_needed("plain"), "plain");
        assert_eq!(quote_if_needed("a b"), "\"a b\"");
        assert_eq!(quote_if_needed("a\"b"), "\"a\\\"b\"");
    }
}
