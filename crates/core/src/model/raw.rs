use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::{Error as _, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::{LogshipError, Result};

/// Loosely typed field mapping for one parsed access-log request.
pub type RawFields = Map<String, Value>;

/// HTTP header mapping with case-insensitive lookup.
///
/// Names are lowercased once on construction; when two names only differ by
/// case the later one in source order wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: BTreeMap<String, String>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.entries.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Entries whose (lowercased) name starts with `prefix`.
    pub fn with_prefix<'a>(&'a self, prefix: &str) -> impl Iterator<Item = (&'a str, &'a str)> {
        let prefix = prefix.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(move |(name, _)| name.starts_with(&prefix))
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for HeaderMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct HeaderVisitor;

        impl<'de> Visitor<'de> for HeaderVisitor {
            type Value = HeaderMap;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of header names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<HeaderMap, A::Error> {
                let mut out = HeaderMap::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    out.insert(&name, value);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(HeaderVisitor)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (name, value) in iter {
            out.insert(name.as_ref(), value);
        }
        out
    }
}

/// One API Gateway request as seen in its execution log.
///
/// Every recognized field is optional; fields not listed here are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawLogRecord {
    pub request_id: Option<String>,
    pub api_stage: Option<String>,
    #[serde(
        rename = "@timestamp",
        default,
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "request-execution-duration")]
    pub request_execution_duration: Option<u64>,
    pub http_method: Option<String>,
    pub http_resource_path: Option<String>,
    #[serde(default, deserialize_with = "integer_like")]
    pub method_status: Option<u16>,
    pub integration_latency: Option<u64>,
    pub endpoint_response_headers: Option<HeaderMap>,
    pub method_request_headers: Option<HeaderMap>,
    pub method_response_headers: Option<HeaderMap>,
    pub customer_function_error: Option<String>,
    pub execution_failure: Option<String>,
    pub key_throttle: Option<Map<String, Value>>,
}

impl RawLogRecord {
    pub fn from_fields(fields: RawFields) -> Result<Self> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| LogshipError::Parse(format!("unparseable log record: {e}")))
    }
}

fn integer_like<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntegerLike {
        Number(u16),
        Text(String),
    }

    match Option::<IntegerLike>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntegerLike::Number(n)) => Ok(Some(n)),
        Some(IntegerLike::Text(s)) => s
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("method_status {s:?}: {e}"))),
    }
}
