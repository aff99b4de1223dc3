//! Parameterized-value converter (§3 `ParameterizedValue<U>`, §4.B
//! `ParamValueConverter<U>`).

use crate::error::Error;
use crate::field::converter::{quote_if_needed, Converter};
use crate::field::value::{FieldValue, ParameterizedValue};
use crate::token::Cursor;

/// Splits on `;`, delegates the head to `inner`, and parses each
/// `key=value` pair with case-folding on the key (§4.B).
pub struct ParamValueConverter<C> {
    pub inner: C,
}

impl<C> ParamValueConverter<C> {
    pub fn new(inner: C) -> Self {
        ParamValueConverter { inner }
    }
}

impl<C: Converter> Converter for ParamValueConverter<C> {
    fn as_field_value(&self, value: &FieldValue) -> Result<String, Error> {
        let pv = match value {
            FieldValue::Parameterized(pv) => pv,
            _ => return Err(Error::new_parse("expected a parameterized field value")),
        };
        let mut out = self.inner.as_field_value(&pv.base)?;
        for (name, val) in &pv.params {
            out.push_str("; ");
            out.push_str(name);
            out.push('=');
            out.push_str(&quote_if_needed(val));
        }
        Ok(out)
    }

    fn from_field_value(&self, text: &str) -> Result<FieldValue, Error> {
        let mut cursor = Cursor::new(text.as_bytes());
        let parts = cursor.split_respecting_quotes(b';');
        let (head, rest) = parts.split_first().ok_or_else(|| Error::new_parse("empty parameterized value"))?;
        let head_text = std::str::from_utf8(head).map_err(|_| Error::new_parse("value is not valid UTF-8"))?;
        let base = self.inner.from_field_value(head_text)?;
        let mut pv = ParameterizedValue::new(base);
        for raw in rest {
            let text = std::str::from_utf8(raw).map_err(|_| Error::new_parse("parameter is not valid UTF-8"))?;
            let (name, value) = parse_param(text)?;
            pv = pv.with_param(name, value);
        }
        Ok(FieldValue::Parameterized(pv))
    }
}

fn parse_param(text: &str) -> Result<(String, String), Error> {
    let eq = text.find('=').ok_or_else(|| Error::new_parse("parameter missing '='"))?;
    let name = text[..eq].trim().to_ascii_lowercase();
    if name.is_empty() {
        return Err(Error::new_parse("parameter name is empty"));
    }
    let raw_value = text[eq + 1..].trim();
    let value = if raw_value.starts_with('"') {
        let mut c = Cursor::new(raw_value.as_bytes());
        let unescaped = c.next_quoted_string()?;
        String::from_utf8(unescaped).map_err(|_| Error::new_parse("quoted parameter value is not valid UTF-8"))?
    } else {
        raw_value.to_string()
    };
    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::converter::StringConverter;

    #[test]
    fn parses_base_and_params() {
        let c = ParamValueConverter::new(StringConverter::unquoted());
        let v = c.from_field_value("text/html; charset=UTF-8; Q=1").unwrap();
        let pv = match &v {
            FieldValue::Parameterized(pv) => pv,
            _ => panic!("expected parameterized"),
        };
        assert_eq!(pv.base.as_str(), Some("text/html"));
        assert_eq!(pv.param("charset"), Some("UTF-8"));
        assert_eq!(pv.param("q"), Some("1"));
    }

    #[test]
    fn quotes_params_needing_it() {
        let c = ParamValueConverter::new(StringConverter::unquoted());
        let v = c.from_field_value(r#"foo; name="a b""#).unwrap();
        assert_eq!(c.as_field_value(&v).unwrap(), r#"foo; name="a b""#);
    }

    #[test]
    fn param_names_are_case_folded() {
        let c = ParamValueConverter::new(StringConverter::unquoted());
        let v = c.from_field_value("foo; Charset=utf-8").unwrap();
        let pv = match &v {
            FieldValue::Parameterized(pv) => pv,
            _ => panic!("expected parameterized"),
        };
        assert_eq!(pv.param("charset"), Some("utf-8"));
    }
}
