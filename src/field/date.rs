//! Date field converter (§4.B): IMF-fixdate out, three formats in.

use std::time::SystemTime;

use crate::error::Error;
use crate::field::converter::Converter;
use crate::field::value::FieldValue;

/// Converts between RFC 7231 `HTTP-date` text and `SystemTime`.
///
/// Output always uses IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
/// Input accepts IMF-fixdate, RFC 850 (two-digit years mapped to the
/// sliding 50-year window), and `asctime`, per `httpdate`, which already
/// implements exactly this trio.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateConverter;

impl Converter for DateConverter {
    fn as_field_value(&self, value: &FieldValue) -> Result<String, Error> {
        let t = value.as_date().ok_or_else(|| Error::new_parse("expected a date field value"))?;
        Ok(httpdate::fmt_http_date(t))
    }

    fn from_field_value(&self, text: &str) -> Result<FieldValue, Error> {
        httpdate::parse_http_date(text.trim())
            .map(FieldValue::Date)
            .map_err(|_| Error::new_parse("not a valid HTTP-date"))
    }
}

/// Formats `t` as IMF-fixdate directly, for call sites (encoder Date
/// auto-fill, §4.E) that don't otherwise need a `FieldValue`.
pub fn format_imf_fixdate(t: SystemTime) -> String {
    httpdate::fmt_http_date(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn round_trips_imf_fixdate() {
        let c = DateConverter;
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(784111777);
        let text = c.as_field_value(&FieldValue::Date(t)).unwrap();
        assert_eq!(text, "Sun, 06 Nov 1994 08:49:37 GMT");
        let parsed = c.from_field_value(&text).unwrap();
        assert_eq!(parsed.as_date(), Some(t));
    }

    #[test]
    fn accepts_rfc850_and_asctime() {
        let c = DateConverter;
        let imf = c.from_field_value("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        let rfc850 = c.from_field_value("Sunday, 06-Nov-94 08:49:37 GMT").unwrap();
        let asctime = c.from_field_value("Sun Nov  6 08:49:37 1994").unwrap();
        assert_eq!(imf, rfc850);
        assert_eq!(imf, asctime);
    }
}
