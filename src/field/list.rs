//! List field converter (§3 `ListField<T>`, §4.B `ListConverter<T>`).

use crate::error::Error;
use crate::field::converter::Converter;
use crate::field::value::FieldValue;
use crate::token::Cursor;

/// Splits on `,` outside quotes, trims, then delegates each item to
/// `inner`. Preserves duplicates and insertion order (§3).
pub struct ListConverter<C> {
    pub inner: C,
}

impl<C> ListConverter<C> {
    pub fn new(inner: C) -> Self {
        ListConverter { inner }
    }
}

impl<C: Converter> Converter for ListConverter<C> {
    fn as_field_value(&self, value: &FieldValue) -> Result<String, Error> {
        let items = value.as_list().ok_or_else(|| Error::new_parse("expected a list field value"))?;
        let mut rendered = Vec::with_capacity(items.len());
        for item in items {
            rendered.push(self.inner.as_field_value(item)?);
        }
        Ok(rendered.join(", "))
    }

    fn from_field_value(&self, text: &str) -> Result<FieldValue, Error> {
        let mut cursor = Cursor::new(text.as_bytes());
        let raw_items = cursor.split_respecting_quotes(b',');
        let mut items = Vec::with_capacity(raw_items.len());
        for raw in raw_items {
            if raw.is_empty() {
                continue;
            }
            let text = std::str::from_utf8(raw).map_err(|_| Error::new_parse("list item is not valid UTF-8"))?;
            items.push(self.inner.from_field_value(text)?);
        }
        Ok(FieldValue::List(items))
    }
}
