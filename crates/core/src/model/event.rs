use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub const SERVICE_NAME: &str = "APIGateway";
pub const KEY_THROTTLE_NAME: &str = "KeyThrottle";
pub const KEY_THROTTLE_ERROR_NAME: &str = "APIGateway-KeyThrottle";
pub const KEY_THROTTLE_ERROR_MESSAGE: &str = "Request throttled because the API Gateway stage is over capacity. Increase the ThrottlingBurstLimit and ThrottlingRateLimit in your Stage method settings";
pub const LAMBDA_INVOCATION_ERROR_NAME: &str = "LambdaInvocationError";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Error,
    Trace,
}

/// Normalized API Gateway event, serialized as one flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StructuredEvent {
    Throttle(ThrottleEvent),
    Trace(TraceEvent),
}

impl StructuredEvent {
    pub fn level(&self) -> Level {
        match self {
            Self::Throttle(_) => Level::Error,
            Self::Trace(_) => Level::Trace,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Throttle(e) => e.status_code,
            Self::Trace(e) => e.status_code,
        }
    }
}

/// A request rejected by the stage's key throttle.
///
/// The fields of `key_throttle` are merged over the fixed fields when
/// serialized; on a name clash the throttle field wins.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleEvent {
    pub request_id: Option<String>,
    pub api_stage: Option<String>,
    pub duration_ms: Option<u64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub status_code: Option<u16>,
    pub key_throttle: Map<String, Value>,
}

impl ThrottleEvent {
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("service_name".into(), SERVICE_NAME.into());
        insert_opt(&mut out, "request_id", self.request_id.clone());
        insert_opt(&mut out, "api_stage", self.api_stage.clone());
        out.insert("level".into(), "ERROR".into());
        out.insert("errorMessage".into(), KEY_THROTTLE_ERROR_MESSAGE.into());
        out.insert("errorName".into(), KEY_THROTTLE_ERROR_NAME.into());
        out.insert("name".into(), KEY_THROTTLE_NAME.into());
        insert_opt(&mut out, "duration_ms", self.duration_ms);
        insert_opt(
            &mut out,
            "timestamp",
            self.timestamp.map(|ts| ts.timestamp_millis()),
        );
        insert_opt(&mut out, "status_code", self.status_code);
        for (key, value) in &self.key_throttle {
            out.insert(key.clone(), value.clone());
        }
        out
    }
}

impl Serialize for ThrottleEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_fields().serialize(serializer)
    }
}

/// Full request/response detail for a failed or debug-enabled request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    pub service_name: &'static str,
    pub level: Level,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "chrono::serde::ts_milliseconds_option::serialize"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_resource_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_latency: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_failure: Option<String>,
    pub request_correlation_ids: BTreeMap<String, String>,
    #[serde(flatten)]
    pub headers: MappedHeaders,
}

/// Trace fields derived from request and endpoint response headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappedHeaders {
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "errorName", skip_serializing_if = "Option::is_none")]
    pub error_name: Option<&'static str>,
}

fn insert_opt<T: Into<Value>>(out: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        out.insert(key.to_string(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn throttle() -> ThrottleEvent {
        ThrottleEvent {
            request_id: Some("r-1".into()),
            api_stage: Some("prod".into()),
            duration_ms: Some(3),
            timestamp: Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()),
            status_code: Some(429),
            key_throttle: json!({"code": "X", "error": true, "message": "Y"})
                .as_object()
                .cloned()
                .unwrap(),
        }
    }

    #[test]
    fn throttle_serializes_flat_with_merged_fields() {
        let value = serde_json::to_value(StructuredEvent::Throttle(throttle())).unwrap();
        assert_eq!(value["service_name"], "APIGateway");
        assert_eq!(value["level"], "ERROR");
        assert_eq!(value["errorName"], "APIGateway-KeyThrottle");
        assert_eq!(value["name"], "KeyThrottle");
        assert_eq!(value["status_code"], 429);
        assert_eq!(value["timestamp"], 1_769_904_000_000i64);
        assert_eq!(value["code"], "X");
        assert_eq!(value["error"], true);
        assert_eq!(value["message"], "Y");
    }

    #[test]
    fn throttle_fields_override_fixed_ones() {
        let mut event = throttle();
        event.key_throttle.insert("name".into(), json!("Custom"));
        event.key_throttle.insert("status_code".into(), json!(503));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["name"], "Custom");
        assert_eq!(value["status_code"], 503);
    }

    #[test]
    fn trace_omits_absent_fields() {
        let event = TraceEvent {
            service_name: SERVICE_NAME,
            level: Level::Trace,
            api_stage: Some("dev".into()),
            duration_ms: None,
            timestamp: None,
            status_code: Some(404),
            http_method: Some("GET".into()),
            http_resource_path: Some("/orders".into()),
            integration_latency: None,
            execution_failure: None,
            request_correlation_ids: BTreeMap::new(),
            headers: MappedHeaders {
                request_id: Some("lambda-req".into()),
                ..MappedHeaders::default()
            },
        };

        let value = serde_json::to_value(StructuredEvent::Trace(event)).unwrap();
        assert_eq!(
            value,
            json!({
                "service_name": "APIGateway",
                "level": "TRACE",
                "api_stage": "dev",
                "status_code": 404,
                "http_method": "GET",
                "http_resource_path": "/orders",
                "request_correlation_ids": {},
                "requestId": "lambda-req",
            })
        );
    }
}
