//! Weighted-value converter (§3 `WeightedValue`).

use crate::error::Error;
use crate::field::converter::Converter;
use crate::field::param::ParamValueConverter;
use crate::field::value::{FieldValue, WeightedValue};

pub use crate::field::value::sort_by_weight;

/// Parses/renders a [`WeightedValue`]: a parameterized value whose `q`
/// parameter (if present) is the content-negotiation weight.
pub struct WeightedConverter<C> {
    params: ParamValueConverter<C>,
}

impl<C> WeightedConverter<C> {
    pub fn new(inner: C) -> Self {
        WeightedConverter { params: ParamValueConverter::new(inner) }
    }
}

impl<C: Converter> Converter for WeightedConverter<C> {
    fn as_field_value(&self, value: &FieldValue) -> Result<String, Error> {
        let weighted = match value {
            FieldValue::Weighted(w) => w,
            _ => return Err(Error::new_parse("expected a weighted field value")),
        };
        self.params.as_field_value(&FieldValue::Parameterized(weighted.value.clone()))
    }

    fn from_field_value(&self, text: &str) -> Result<FieldValue, Error> {
        let parsed = self.params.from_field_value(text)?;
        let pv = match parsed {
            FieldValue::Parameterized(pv) => pv,
            _ => unreachable!("ParamValueConverter always yields Parameterized"),
        };
        if let Some(q) = pv.param("q") {
            let weight: f32 = q.parse().map_err(|_| Error::new_parse("q parameter is not a number"))?;
            if !(0.0..=1.0).contains(&weight) {
                return Err(Error::new_parse("q parameter out of [0.0, 1.0]"));
            }
        }
        Ok(FieldValue::Weighted(WeightedValue { value: pv }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::converter::StringConverter;

    #[test]
    fn parses_weight_and_defaults_absent_to_one() {
        let c = WeightedConverter::new(StringConverter::unquoted());
        let explicit = c.from_field_value("gzip; q=0.5").unwrap();
        let absent = c.from_field_value("deflate").unwrap();
        let (w1, w2) = match (explicit, absent) {
            (FieldValue::Weighted(a), FieldValue::Weighted(b)) => (a, b),
            _ => panic!("expected weighted values"),
        };
        assert_eq!(w1.weight(), 0.5);
        assert_eq!(w2.weight(), 1.0);
    }

    #[test]
    fn rejects_out_of_range_weight() {
        let c = WeightedConverter::new(StringConverter::unquoted());
        assert!(c.from_field_value("gzip; q=1.5").is_err());
    }
}
