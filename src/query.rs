//! `application/x-www-form-urlencoded` codec (component H, §6).
//!
//! Built on `url::form_urlencoded`, the percent-encoding crate the pack
//! already reaches for (the teacher's own dev-dependencies, and
//! `pyfisch-httptypes`'s main dependencies, both use the `url` crate
//! family for this).

use http::Uri;

use crate::error::Error;

/// `UTF-8` is the only charset this core implements (§6 `[ADDED]`); the
/// parameter exists for interface-shape parity with a charset-aware host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
}

fn require_utf8(charset: Charset) -> Result<(), Error> {
    match charset {
        Charset::Utf8 => Ok(()),
    }
}

/// An ordered, immutable `key → list<value>` map decoded from a request's
/// raw query string, cached by [`crate::HttpRequest::query_data`] after
/// first access (§6, §9).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryData {
    /// Insertion order of first occurrence of each key, then values for
    /// that key in arrival order — matches §8 invariant 6's "ordered-map
    /// equality".
    entries: Vec<(String, Vec<String>)>,
}

impl QueryData {
    pub fn parse(raw_query: &str) -> Result<Self, Error> {
        let mut entries: Vec<(String, Vec<String>)> = Vec::new();
        for (key, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
            let key = key.into_owned();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some((_, values)) => values.push(value.into_owned()),
                None => entries.push((key, vec![value.into_owned()])),
            }
        }
        Ok(QueryData { entries })
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `wwwFormUrlencode(map<k, list<v>>, charset)`: stable insertion-order,
/// duplicate-key-preserving encoder (§6, §8 S5).
pub fn www_form_urlencode<K, V, I, J>(entries: I, charset: Charset) -> Result<String, Error>
where
    K: AsRef<str>,
    V: AsRef<str>,
    J: IntoIterator<Item = V>,
    I: IntoIterator<Item = (K, J)>,
{
    require_utf8(charset)?;
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, values) in entries {
        for value in values {
            serializer.append_pair(key.as_ref(), value.as_ref());
        }
    }
    Ok(serializer.finish())
}

/// `simpleWwwFormUrlencode(map<k, v>, charset)`: one value per key.
pub fn simple_www_form_urlencode<K, V, I>(entries: I, charset: Charset) -> Result<String, Error>
where
    K: AsRef<str>,
    V: AsRef<str>,
    I: IntoIterator<Item = (K, V)>,
{
    www_form_urlencode(entries.into_iter().map(|(k, v)| (k, std::iter::once(v))), charset)
}

/// `replaceQuery(uri, rawQuery)`: a new URI with the query replaced,
/// preserving scheme, authority, and path; no `?` is inserted when
/// `raw_query` is blank (§6). `http::Uri` has no fragment component to
/// preserve — RFC 7230 request-targets never carry one.
pub fn replace_query(uri: &Uri, raw_query: &str) -> Result<Uri, Error> {
    let parts = uri.clone().into_parts();
    let path = parts
        .path_and_query
        .as_ref()
        .map(|pq| pq.path())
        .unwrap_or("/")
        .to_string();
    let path_and_query = if raw_query.is_empty() {
        path
    } else {
        format!("{}?{}", path, raw_query)
    };
    let mut builder = Uri::builder();
    if let Some(scheme) = parts.scheme {
        builder = builder.scheme(scheme);
    }
    if let Some(authority) = parts.authority {
        builder = builder.authority(authority);
    }
    builder
        .path_and_query(path_and_query)
        .build()
        .map_err(|_| Error::new_parse("could not rebuild URI with replaced query"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s5_scenario_encodes_in_insertion_order() {
        let encoded = www_form_urlencode(
            vec![
                ("first", vec!["value1.1", "value1.2"]),
                ("second", vec!["value2"]),
                ("third", vec!["v\u{e4}lue3"]),
            ],
            Charset::Utf8,
        )
        .unwrap();
        assert_eq!(encoded, "first=value1.1&first=value1.2&second=value2&third=v%C3%A4lue3");
    }

    #[test]
    fn parse_then_encode_round_trips_under_ordered_equality() {
        let raw = "a=1&b=2&a=3";
        let parsed = QueryData::parse(raw).unwrap();
        assert_eq!(parsed.get("a"), Some(&["1".to_string(), "3".to_string()][..]));
        let reencoded = www_form_urlencode(parsed.iter().map(|(k, v)| (k, v.to_vec())), Charset::Utf8).unwrap();
        let reparsed = QueryData::parse(&reencoded).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn simple_encode_uses_plus_for_space() {
        let encoded = simple_www_form_urlencode(vec![("q", "a b")], Charset::Utf8).unwrap();
        assert_eq!(encoded, "q=a+b");
    }

    #[test]
    fn replace_query_preserves_other_parts() {
        let uri: Uri = "http://example.com/path?old=1".parse().unwrap();
        let replaced = replace_query(&uri, "new=2").unwrap();
        assert_eq!(replaced.scheme_str(), Some("http"));
        assert_eq!(replaced.authority().map(|a| a.as_str()), Some("example.com"));
        assert_eq!(replaced.path(), "/path");
        assert_eq!(replaced.query(), Some("new=2"));
    }

    #[test]
    fn replace_query_blank_inserts_no_question_mark() {
        let uri: Uri = "http://example.com/path?old=1".parse().unwrap();
        let replaced = replace_query(&uri, "").unwrap();
        assert_eq!(replaced.to_string(), "http://example.com/path");
    }
}
