//! Query model and canonical serialization.
//!
//! Signatures are computed over a fully assembled URL, so generation and
//! verification must serialize the same logical query to the same bytes.
//! Keys are emitted in insertion order (the order the caller built the map
//! in, or the wire order of an inbound request), never sorted. Nested maps
//! and sequences flatten to bracket notation: `a[b]=1`, `a[0]=1`.

use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// RFC 3986 unreserved characters stay literal, everything else is escaped.
/// This must match on both the signing and the verifying side.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A single query value. Nested maps and sequences are flattened during
/// serialization; scalars render the way their JSON counterparts would.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Instant(DateTime<Utc>),
    Seq(Vec<QueryValue>),
    Map(QueryMap),
}

impl QueryValue {
    fn render_scalar(&self) -> Option<String> {
        match self {
            QueryValue::Str(s) => Some(s.clone()),
            QueryValue::Int(i) => Some(i.to_string()),
            QueryValue::Float(f) => Some(f.to_string()),
            QueryValue::Bool(b) => Some(b.to_string()),
            QueryValue::Instant(t) => Some(format_instant(t)),
            QueryValue::Seq(_) | QueryValue::Map(_) => None,
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for QueryValue {
    fn from(value: DateTime<Utc>) -> Self {
        QueryValue::Instant(value)
    }
}

impl From<Vec<QueryValue>> for QueryValue {
    fn from(value: Vec<QueryValue>) -> Self {
        QueryValue::Seq(value)
    }
}

impl From<QueryMap> for QueryValue {
    fn from(value: QueryMap) -> Self {
        QueryValue::Map(value)
    }
}

impl From<serde_json::Value> for QueryValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => QueryValue::Str(String::new()),
            serde_json::Value::Bool(b) => QueryValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    QueryValue::Int(i)
                } else {
                    QueryValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => QueryValue::Str(s),
            serde_json::Value::Array(items) => {
                QueryValue::Seq(items.into_iter().map(QueryValue::from).collect())
            }
            serde_json::Value::Object(map) => QueryValue::Map(QueryMap::from(map)),
        }
    }
}

/// An insertion-ordered query map. `insert` on an existing key replaces the
/// value in place, keeping the key's original position, so re-signing the
/// same map always serializes identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryMap(Vec<(String, QueryValue)>);

impl QueryMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        let index = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(index).1)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for QueryMap {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        let mut out = QueryMap::new();
        for (key, value) in map {
            out.insert(key, QueryValue::from(value));
        }
        out
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for QueryMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut out = QueryMap::new();
        for (key, value) in iter {
            out.insert(key, value);
        }
        out
    }
}

/// Render an instant the way the reserved `expirationDate` key expects it:
/// millisecond precision, `Z` suffix (`2025-01-01T00:00:00.000Z`).
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serialize a query map to its canonical string form. Empty map yields an
/// empty string; the caller is responsible for omitting the `?` in that case.
pub fn stringify_query(query: &QueryMap) -> String {
    let mut pairs = Vec::new();
    for (key, value) in query.iter() {
        flatten_value(key, value, &mut pairs);
    }
    encode_pairs(&pairs)
}

fn flatten_value(key: &str, value: &QueryValue, out: &mut Vec<(String, String)>) {
    match value {
        QueryValue::Seq(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(&format!("{key}[{index}]"), item, out);
            }
        }
        QueryValue::Map(map) => {
            for (sub_key, sub_value) in map.iter() {
                flatten_value(&format!("{key}[{sub_key}]"), sub_value, out);
            }
        }
        scalar => {
            // render_scalar is total for non-container variants
            if let Some(rendered) = scalar.render_scalar() {
                out.push((key.to_string(), rendered));
            }
        }
    }
}

/// Percent-encode flat key/value pairs into a query string, preserving the
/// order of the slice. Used directly on the verification side, where the
/// pairs come from the inbound request in wire order.
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, COMPONENT),
                utf8_percent_encode(value, COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode a single URI component (path segment value or query part).
pub(crate) fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, COMPONENT).to_string()
}

/// Decode a raw query string into flat pairs, preserving wire order.
/// `+` is treated as a space, matching form-urlencoded semantics.
pub fn parse_query(raw: &str) -> Vec<(String, String)> {
    if raw.is_empty() {
        return Vec::new();
    }

    raw.split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (key, value) = match part.split_once('=') {
                Some((key, value)) => (key, value),
                None => (part, ""),
            };
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let unplussed = raw.replace('+', " ");
    percent_decode_str(&unplussed)
        .decode_utf8_lossy()
        .into_owned()
}
