//! Typed header fields and their converters (component B, §3, §4.B).

pub mod commented;
pub mod converter;
pub mod date;
pub mod list;
pub mod param;
pub mod value;
pub mod weighted;

pub use commented::CommentedConverter;
pub use converter::{quote, quote_if_needed, Converter, IntConverter, StringConverter};
pub use date::DateConverter;
pub use list::ListConverter;
pub use param::ParamValueConverter;
pub use value::{CommentedValue, FieldValue, ParameterizedValue, WeightedValue};
pub use weighted::{sort_by_weight, WeightedConverter};

use http::HeaderName;

/// A single header field: a case-insensitive name (canonically cased on
/// output) and its typed value (§3 `HttpField<T>`).
///
/// Equality and ordering are defined on the name alone; callers compare
/// values through `FieldValue`'s own `PartialEq`.
#[derive(Debug, Clone)]
pub struct HttpField {
    name: HeaderName,
    value: FieldValue,
}

impl HttpField {
    pub fn new(name: HeaderName, value: FieldValue) -> Self {
        HttpField { name, value }
    }

    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn into_value(self) -> FieldValue {
        self.value
    }
}

impl PartialEq for HttpField {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

/// Looks up the converter a well-known header name uses, falling back to
/// an opaque quotable string for anything else (§7: unknown header names
/// are not errors, they become opaque string fields).
///
/// Grounded on the header-specific dispatch hyper's `header!` macro table
/// and `proto::h1::role`/`encode` special-case (matching on `CONTENT_LENGTH`,
/// `TRANSFER_ENCODING`, `CONNECTION`, and friends) perform, minus the
/// per-header newtypes hyper generates — this crate dispatches straight to
/// a shared `FieldValue` shape instead.
pub fn converter_for(name: &HeaderName) -> Box<dyn Converter> {
    use http::header;
    match *name {
        header::CONTENT_LENGTH => Box::new(IntConverter),
        header::DATE | header::EXPIRES | header::LAST_MODIFIED | header::IF_MODIFIED_SINCE => {
            Box::new(DateConverter)
        }
        header::TRANSFER_ENCODING | header::CONNECTION | header::TRAILER | header::VARY => {
            Box::new(ListConverter::new(StringConverter::unquoted()))
        }
        header::CONTENT_TYPE => Box::new(ParamValueConverter::new(StringConverter::unquoted())),
        header::ACCEPT | header::ACCEPT_ENCODING | header::ACCEPT_LANGUAGE | header::TE => Box::new(
            ListConverter::new(WeightedConverter::new(ParamValueConverter::new(StringConverter::unquoted()))),
        ),
        _ => Box::new(StringConverter::quotable()),
    }
}
