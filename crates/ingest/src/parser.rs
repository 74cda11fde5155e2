//! Parser for API Gateway execution logs.
//!
//! API Gateway writes one line per execution step, each prefixed with the
//! request id: `(9b3b…) Method completed with status: 200`. The parser groups
//! a batch's lines by request and turns the steps it recognizes into one flat
//! field mapping per request.

use std::collections::HashMap;
use std::sync::LazyLock;

use logship_core::model::awslogs::LogsData;
use logship_core::model::raw::RawFields;
use regex::Regex;
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    String,
    Boolean,
    Number,
}

/// A key recovered, with its declared type, from a response body API Gateway
/// cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncatedKey {
    pub key: &'static str,
    pub kind: KeyType,
}

pub const TRUNCATED_RESPONSE_KEYS: &[TruncatedKey] = &[
    TruncatedKey {
        key: "code",
        kind: KeyType::String,
    },
    TruncatedKey {
        key: "error",
        kind: KeyType::Boolean,
    },
    TruncatedKey {
        key: "message",
        kind: KeyType::String,
    },
];

#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub truncated_response_keys: Vec<TruncatedKey>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            truncated_response_keys: TRUNCATED_RESPONSE_KEYS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Capture {
    Text,
    Integer,
    Headers,
    Body,
}

struct LineRule {
    pattern: Regex,
    captures: &'static [(&'static str, Capture)],
}

fn rule(pattern: &str, captures: &'static [(&'static str, Capture)]) -> LineRule {
    LineRule {
        pattern: Regex::new(pattern).expect("execution log line pattern"),
        captures,
    }
}

static REQUEST_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\((?P<request_id>[^)\s]+)\) (?P<text>.*)$").expect("request prefix pattern")
});

static LINE_RULES: LazyLock<Vec<LineRule>> = LazyLock::new(|| {
    vec![
        rule(
            r"^HTTP Method: (?P<http_method>\S+), Resource Path: (?P<http_resource_path>\S+)$",
            &[
                ("http_method", Capture::Text),
                ("http_resource_path", Capture::Text),
            ],
        ),
        rule(
            r"(?s)^Method request headers: (?P<method_request_headers>.*)$",
            &[("method_request_headers", Capture::Headers)],
        ),
        rule(
            r"(?s)^Endpoint response headers: (?P<endpoint_response_headers>.*)$",
            &[("endpoint_response_headers", Capture::Headers)],
        ),
        rule(
            r"(?s)^Method response headers: (?P<method_response_headers>.*)$",
            &[("method_response_headers", Capture::Headers)],
        ),
        rule(
            r"^Received response\. Status: (?P<endpoint_status>\d+), Integration latency: (?P<integration_latency>\d+) ms$",
            &[
                ("endpoint_status", Capture::Integer),
                ("integration_latency", Capture::Integer),
            ],
        ),
        rule(
            r"^Method completed with status: (?P<method_status>\d+)$",
            &[("method_status", Capture::Integer)],
        ),
        rule(
            r"(?s)^Lambda execution failed with status \d+ due to customer function error: (?P<customer_function_error>.*)$",
            &[("customer_function_error", Capture::Text)],
        ),
        rule(
            r"(?s)^Execution failed due to (?P<execution_failure>.*)$",
            &[("execution_failure", Capture::Text)],
        ),
        rule(
            r"(?s)^Key throttle limit exceeded: (?P<key_throttle>.*)$",
            &[("key_throttle", Capture::Body)],
        ),
    ]
});

struct RequestLog {
    request_id: String,
    first_ts: i64,
    last_ts: i64,
    fields: RawFields,
}

/// Groups the batch by request id, in first-seen order, and returns one field
/// mapping per request.
pub fn parse_logs(config: &ParserConfig, data: &LogsData) -> Vec<RawFields> {
    let api_stage = stage_from_log_group(&data.log_group);
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut requests: Vec<RequestLog> = Vec::new();

    for event in &data.log_events {
        let Some(caps) = REQUEST_PREFIX.captures(event.message.trim_end()) else {
            tracing::trace!(id = %event.id, "skipping line without request id");
            continue;
        };
        let request_id = &caps["request_id"];
        let slot = *index.entry(request_id.to_string()).or_insert_with(|| {
            requests.push(RequestLog {
                request_id: request_id.to_string(),
                first_ts: event.timestamp,
                last_ts: event.timestamp,
                fields: RawFields::new(),
            });
            requests.len() - 1
        });

        let request = &mut requests[slot];
        request.first_ts = request.first_ts.min(event.timestamp);
        request.last_ts = request.last_ts.max(event.timestamp);
        apply_line(config, &caps["text"], &mut request.fields);
    }

    tracing::debug!(
        log_group = %data.log_group,
        lines = data.log_events.len(),
        requests = requests.len(),
        "parsed execution log batch"
    );

    requests
        .into_iter()
        .map(|request| finish(request, api_stage))
        .collect()
}

fn apply_line(config: &ParserConfig, text: &str, fields: &mut RawFields) {
    let Some((rule, caps)) = LINE_RULES
        .iter()
        .find_map(|rule| rule.pattern.captures(text).map(|caps| (rule, caps)))
    else {
        return;
    };

    for (name, capture) in rule.captures {
        let Some(raw) = caps.name(name).map(|m| m.as_str()) else {
            continue;
        };
        let value = match capture {
            Capture::Text => Value::String(raw.trim().to_string()),
            Capture::Integer => raw
                .parse::<u64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            Capture::Headers => Value::Object(parse_header_list(raw)),
            Capture::Body => Value::Object(parse_body(config, raw)),
        };
        fields.insert((*name).to_string(), value);
    }
}

fn finish(request: RequestLog, api_stage: Option<&str>) -> RawFields {
    let mut fields = request.fields;
    fields.insert("request_id".into(), request.request_id.into());
    if let Some(stage) = api_stage {
        fields.insert("api_stage".into(), stage.into());
    }
    fields.insert("@timestamp".into(), request.first_ts.into());
    fields.insert(
        "request-execution-duration".into(),
        (request.last_ts - request.first_ts).max(0).into(),
    );
    fields
}

/// `API-Gateway-Execution-Logs_{rest-api-id}/{stage}` → `stage`.
pub fn stage_from_log_group(log_group: &str) -> Option<&str> {
    log_group
        .rsplit_once('/')
        .map(|(_, stage)| stage)
        .filter(|stage| !stage.is_empty())
}

/// Parses API Gateway's `{Name=value, Other=value}` header rendering.
///
/// Segments that do not start with `token=` belong to the previous value,
/// which keeps `X-Forwarded-For=1.2.3.4, 10.0.0.1` and user agents with
/// `(KHTML, like Gecko)` intact.
pub fn parse_header_list(raw: &str) -> Map<String, Value> {
    let mut body = raw.trim();
    if let Some(stripped) = body.strip_suffix("[TRUNCATED]") {
        body = stripped.trim_end();
    }
    body = body.strip_prefix('{').unwrap_or(body);
    body = body.strip_suffix('}').unwrap_or(body);

    let mut headers: Vec<(String, String)> = Vec::new();
    for segment in body.split(", ") {
        match split_header(segment) {
            Some((name, value)) => headers.push((name.to_string(), value.to_string())),
            None => {
                if let Some((_, value)) = headers.last_mut() {
                    value.push_str(", ");
                    value.push_str(segment);
                }
            }
        }
    }

    headers
        .into_iter()
        .map(|(name, value)| (name, Value::String(value)))
        .collect()
}

fn split_header(segment: &str) -> Option<(&str, &str)> {
    let (name, value) = segment.split_once('=')?;
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return None;
    }
    Some((name, value))
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Parses a response body as a JSON object, recovering the configured keys
/// when the body was truncated and keeping the raw text otherwise.
pub fn parse_body(config: &ParserConfig, raw: &str) -> Map<String, Value> {
    let text = raw.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return map;
    }

    let recovered = recover_truncated(&config.truncated_response_keys, text);
    if !recovered.is_empty() {
        return recovered;
    }

    let mut out = Map::new();
    out.insert("message".into(), Value::String(text.to_string()));
    out
}

fn recover_truncated(keys: &[TruncatedKey], text: &str) -> Map<String, Value> {
    let mut out = Map::new();
    for key in keys {
        let needle = format!("\"{}\"", key.key);
        let found = text.match_indices(&needle).find_map(|(at, _)| {
            let rest = text[at + needle.len()..].trim_start();
            let value = rest.strip_prefix(':')?.trim_start();
            read_typed(value, key.kind)
        });
        if let Some(value) = found {
            out.insert(key.key.to_string(), value);
        }
    }
    out
}

fn read_typed(text: &str, kind: KeyType) -> Option<Value> {
    match kind {
        KeyType::String => read_json_string(text).map(Value::String),
        KeyType::Boolean => {
            if text.starts_with("true") {
                Some(Value::Bool(true))
            } else if text.starts_with("false") {
                Some(Value::Bool(false))
            } else {
                None
            }
        }
        KeyType::Number => {
            let end = text.find(|c: char| {
                !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
            })?;
            serde_json::from_str::<Number>(&text[..end])
                .ok()
                .map(Value::Number)
        }
    }
}

/// Reads a complete JSON string literal from the start of `text`; a literal
/// cut off by truncation yields nothing.
fn read_json_string(text: &str) -> Option<String> {
    let body = text.strip_prefix('"')?;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return serde_json::from_str(&text[..i + 2]).ok(),
            _ => {}
        }
    }
    None
}
