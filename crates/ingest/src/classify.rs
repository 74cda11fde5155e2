//! Decides which API Gateway requests become structured events.
//!
//! A request with no usable response data only produces an event when it was
//! rejected by the stage's key throttle. Otherwise successful traffic is
//! dropped unless the caller turned on debug tracing through the
//! `Debug-Log-Enabled` response header, and every error response is traced.

use std::collections::BTreeMap;

use logship_core::error::Result;
use logship_core::model::event::{
    LAMBDA_INVOCATION_ERROR_NAME, Level, MappedHeaders, SERVICE_NAME, StructuredEvent,
    ThrottleEvent, TraceEvent,
};
use logship_core::model::raw::{HeaderMap, RawFields, RawLogRecord};

pub const CORRELATION_ID_PREFIX: &str = "x-correlation-";
pub const DEBUG_LOG_ENABLED_HEADER: &str = "Debug-Log-Enabled";

/// Decodes one parsed request and classifies it.
pub fn classify_fields(fields: RawFields) -> Result<Option<StructuredEvent>> {
    let record = RawLogRecord::from_fields(fields)?;
    Ok(classify(&record))
}

pub fn classify(record: &RawLogRecord) -> Option<StructuredEvent> {
    let (Some(endpoint_response_headers), Some(method_request_headers)) = (
        record.endpoint_response_headers.as_ref(),
        record.method_request_headers.as_ref(),
    ) else {
        return throttle_event(record).map(StructuredEvent::Throttle);
    };

    if !debug_enabled(record) {
        tracing::trace!(
            request_id = ?record.request_id,
            status = ?record.method_status,
            "suppressing request without debug logging"
        );
        return None;
    }

    Some(StructuredEvent::Trace(trace_event(
        record,
        endpoint_response_headers,
        method_request_headers,
    )))
}

fn throttle_event(record: &RawLogRecord) -> Option<ThrottleEvent> {
    let Some(key_throttle) = &record.key_throttle else {
        tracing::trace!(
            request_id = ?record.request_id,
            "no endpoint response or method request headers; nothing to report"
        );
        return None;
    };

    Some(ThrottleEvent {
        request_id: record.request_id.clone(),
        api_stage: record.api_stage.clone(),
        duration_ms: record.request_execution_duration,
        timestamp: record.timestamp,
        status_code: record.method_status,
        key_throttle: key_throttle.clone(),
    })
}

fn debug_enabled(record: &RawLogRecord) -> bool {
    let header_enabled = record
        .method_response_headers
        .as_ref()
        .and_then(|headers| headers.get(DEBUG_LOG_ENABLED_HEADER))
        == Some("true");
    let status_is_error = record.method_status.is_some_and(|status| status >= 400);
    header_enabled || status_is_error
}

fn trace_event(
    record: &RawLogRecord,
    endpoint_response: &HeaderMap,
    method_request: &HeaderMap,
) -> TraceEvent {
    let header = |headers: &HeaderMap, name: &str| headers.get(name).map(str::to_string);

    let mut mapped = MappedHeaders {
        request_id: header(endpoint_response, "x-amzn-RequestId"),
        remote_ip: header(method_request, "X-Forwarded-For"),
        country: header(method_request, "CloudFront-Viewer-Country"),
        user_agent: header(method_request, "User-Agent"),
        host: header(method_request, "Host"),
        accept: header(method_request, "Accept"),
        content_type: header(endpoint_response, "Content-Type"),
        content_length: header(endpoint_response, "Content-Length"),
        version: header(endpoint_response, "X-Amz-Executed-Version"),
        ..MappedHeaders::default()
    };

    if let Some(error) = record
        .customer_function_error
        .as_deref()
        .filter(|e| !e.is_empty())
    {
        mapped.error_message = Some(error.to_string());
        mapped.error_name = Some(LAMBDA_INVOCATION_ERROR_NAME);
    }

    TraceEvent {
        service_name: SERVICE_NAME,
        level: Level::Trace,
        api_stage: record.api_stage.clone(),
        duration_ms: record.request_execution_duration,
        timestamp: record.timestamp,
        status_code: record.method_status,
        http_method: record.http_method.clone(),
        http_resource_path: record.http_resource_path.clone(),
        integration_latency: record.integration_latency,
        execution_failure: record.execution_failure.clone(),
        request_correlation_ids: correlation_ids(method_request),
        headers: mapped,
    }
}

pub fn correlation_ids(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .with_prefix(CORRELATION_ID_PREFIX)
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use logship_core::LogshipError;
    use serde_json::{Value, json};

    use super::*;

    fn fields(value: Value) -> RawFields {
        value.as_object().cloned().unwrap()
    }

    fn traced_request(status: u16, debug: Option<&str>) -> RawFields {
        let mut response_headers = json!({"Content-Type": "application/json"});
        if let Some(flag) = debug {
            response_headers["Debug-Log-Enabled"] = json!(flag);
        }
        fields(json!({
            "request_id": "r-1",
            "api_stage": "prod",
            "@timestamp": 1_700_000_000_000i64,
            "request-execution-duration": 120,
            "http_method": "GET",
            "http_resource_path": "/orders/{id}",
            "method_status": status,
            "integration_latency": 97,
            "method_request_headers": {
                "Host": "api.example.com",
                "X-Forwarded-For": "1.2.3.4",
                "CloudFront-Viewer-Country": "NL",
                "User-Agent": "curl/8.4.0",
                "Accept": "*/*",
                "X-Correlation-Trace-Id": "abc123",
            },
            "endpoint_response_headers": {
                "x-amzn-RequestId": "lambda-req-1",
                "Content-Type": "application/json",
                "Content-Length": "512",
                "X-Amz-Executed-Version": "$LATEST",
            },
            "method_response_headers": response_headers,
        }))
    }

    fn emitted(fields: RawFields) -> Option<Value> {
        classify_fields(fields)
            .unwrap()
            .map(|event| serde_json::to_value(event).unwrap())
    }

    #[test]
    fn missing_headers_without_throttle_yield_nothing() {
        let record = fields(json!({"request_id": "r-1", "method_status": 500}));
        assert!(classify_fields(record).unwrap().is_none());
    }

    #[test]
    fn one_missing_core_header_map_yields_nothing() {
        let mut record = traced_request(500, None);
        record.remove("endpoint_response_headers");
        assert!(classify_fields(record).unwrap().is_none());
    }

    #[test]
    fn key_throttle_produces_error_event() {
        let event = emitted(fields(json!({
            "request_id": "r-9",
            "api_stage": "prod",
            "@timestamp": 1_700_000_000_000i64,
            "request-execution-duration": 2,
            "method_status": 429,
            "key_throttle": {"code": "X", "error": true, "message": "Y"},
        })))
        .unwrap();

        assert_eq!(event["level"], "ERROR");
        assert_eq!(event["service_name"], "APIGateway");
        assert_eq!(event["errorName"], "APIGateway-KeyThrottle");
        assert_eq!(event["name"], "KeyThrottle");
        assert_eq!(event["duration_ms"], 2);
        assert_eq!(event["timestamp"], 1_700_000_000_000i64);
        assert_eq!(event["status_code"], 429);
        assert_eq!(event["code"], "X");
        assert_eq!(event["error"], true);
        assert_eq!(event["message"], "Y");
        assert!(
            event["errorMessage"]
                .as_str()
                .unwrap()
                .contains("ThrottlingBurstLimit")
        );
    }

    #[test]
    fn successful_request_without_debug_header_is_suppressed() {
        assert!(emitted(traced_request(200, None)).is_none());
        assert!(emitted(traced_request(399, Some("false"))).is_none());
        assert!(emitted(traced_request(200, Some("TRUE"))).is_none());
    }

    #[test]
    fn debug_header_enables_tracing_for_success() {
        let event = emitted(traced_request(200, Some("true"))).unwrap();
        assert_eq!(event["level"], "TRACE");
        assert_eq!(event["status_code"], 200);
    }

    #[test]
    fn debug_header_name_is_case_insensitive() {
        let mut record = traced_request(200, None);
        record["method_response_headers"] = json!({"debug-log-enabled": "true"});
        assert!(emitted(record).is_some());
    }

    #[test]
    fn error_status_is_traced_regardless_of_debug_header() {
        for debug in [None, Some("false"), Some("true")] {
            let event = emitted(traced_request(500, debug)).unwrap();
            assert_eq!(event["status_code"], 500);
            assert_eq!(event["level"], "TRACE");
        }
    }

    #[test]
    fn missing_method_response_headers_count_as_not_enabled() {
        let mut record = traced_request(200, None);
        record.remove("method_response_headers");
        assert!(emitted(record).is_none());

        let mut record = traced_request(404, None);
        record.remove("method_response_headers");
        assert!(emitted(record).is_some());
    }

    #[test]
    fn trace_event_maps_headers() {
        let event = emitted(traced_request(502, None)).unwrap();
        assert_eq!(
            event,
            json!({
                "service_name": "APIGateway",
                "level": "TRACE",
                "api_stage": "prod",
                "duration_ms": 120,
                "timestamp": 1_700_000_000_000i64,
                "status_code": 502,
                "http_method": "GET",
                "http_resource_path": "/orders/{id}",
                "integration_latency": 97,
                "request_correlation_ids": {"x-correlation-trace-id": "abc123"},
                "requestId": "lambda-req-1",
                "remote_ip": "1.2.3.4",
                "country": "NL",
                "user_agent": "curl/8.4.0",
                "host": "api.example.com",
                "accept": "*/*",
                "content_type": "application/json",
                "content_length": "512",
                "version": "$LATEST",
            })
        );
    }

    #[test]
    fn customer_function_error_sets_error_fields() {
        let mut record = traced_request(502, None);
        record.insert("customer_function_error".into(), json!("Task timed out"));
        let event = emitted(record).unwrap();
        assert_eq!(event["errorMessage"], "Task timed out");
        assert_eq!(event["errorName"], "LambdaInvocationError");

        let mut record = traced_request(502, None);
        record.insert("customer_function_error".into(), json!(""));
        let event = emitted(record).unwrap();
        assert!(event.get("errorMessage").is_none());
        assert!(event.get("errorName").is_none());
    }

    #[test]
    fn correlation_ids_are_lowercased() {
        let headers: HeaderMap = [
            ("X-Correlation-Trace-Id", "abc123"),
            ("x-CORRELATION-user-id", "u-7"),
            ("X-Correlation", "no-dash-suffix"),
            ("Host", "api.example.com"),
        ]
        .into_iter()
        .collect();

        let ids = correlation_ids(&headers);
        assert_eq!(ids.len(), 2);
        assert_eq!(ids["x-correlation-trace-id"], "abc123");
        assert_eq!(ids["x-correlation-user-id"], "u-7");
    }

    #[test]
    fn classification_is_repeatable() {
        let record = RawLogRecord::from_fields(traced_request(500, None)).unwrap();
        assert_eq!(classify(&record), classify(&record));

        let throttled = RawLogRecord::from_fields(fields(json!({
            "key_throttle": {"code": "X", "error": true, "message": "Y"},
        })))
        .unwrap();
        assert_eq!(classify(&throttled), classify(&throttled));
    }

    #[test]
    fn unparseable_record_is_an_error() {
        let mut record = traced_request(500, None);
        record.insert("method_status".into(), json!("five hundred"));
        assert!(matches!(
            classify_fields(record),
            Err(LogshipError::Parse(_))
        ));
    }
}
