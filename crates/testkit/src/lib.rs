use std::io::Write;

use base64::Engine;
use flate2::Compression;
use flate2::write::GzEncoder;
use logship_core::model::awslogs::{ExtractedFields, LogEvent, LogsData};
use serde_json::{Value, json};

pub const API_LOG_GROUP: &str = "API-Gateway-Execution-Logs_abc123/prod";
pub const ACCOUNT_ID: &str = "123456789012";

pub fn logs_data(log_group: &str, log_events: Vec<LogEvent>) -> LogsData {
    LogsData {
        message_type: "DATA_MESSAGE".to_string(),
        owner: ACCOUNT_ID.to_string(),
        log_group: log_group.to_string(),
        log_stream: "a1b2c3d4e5f6".to_string(),
        subscription_filters: vec!["ship-logs".to_string()],
        log_events,
    }
}

/// An execution-log line for `request_id`.
pub fn log_event(request_id: &str, timestamp: i64, text: &str) -> LogEvent {
    raw_log_event(timestamp, &format!("({request_id}) {text}"))
}

pub fn raw_log_event(timestamp: i64, message: &str) -> LogEvent {
    LogEvent {
        id: format!("{timestamp}-{}", message.len()),
        timestamp,
        message: message.to_string(),
        extracted_fields: None,
    }
}

/// A line matched by a `[timestamp, request_id, event]` filter pattern.
pub fn extracted_event(request_id: &str, timestamp: &str, event: &str) -> LogEvent {
    LogEvent {
        id: format!("{request_id}-{timestamp}"),
        timestamp: 0,
        message: format!("{timestamp}\t{request_id}\t{event}"),
        extracted_fields: Some(ExtractedFields {
            request_id: Some(request_id.to_string()),
            event: Some(event.to_string()),
            timestamp: Some(timestamp.to_string()),
        }),
    }
}

/// Execution log of a request rejected by the usage plan's key throttle.
pub fn throttled_request(request_id: &str, start: i64) -> Vec<LogEvent> {
    vec![
        log_event(
            request_id,
            start,
            "HTTP Method: GET, Resource Path: /orders",
        ),
        log_event(
            request_id,
            start + 1,
            r#"Key throttle limit exceeded: {"code":"429","error":true,"message":"Too Many Requests"}"#,
        ),
        log_event(request_id, start + 2, "Method completed with status: 429"),
    ]
}

/// Execution log of a request proxied to a Lambda integration.
pub fn traced_request(request_id: &str, start: i64, status: u16, debug: bool) -> Vec<LogEvent> {
    let method_response = if debug {
        "Method response headers: {Content-Type=application/json, Debug-Log-Enabled=true}"
    } else {
        "Method response headers: {Content-Type=application/json}"
    };

    vec![
        log_event(
            request_id,
            start,
            "HTTP Method: GET, Resource Path: /orders/{id}",
        ),
        log_event(
            request_id,
            start + 1,
            &format!(
                "Method request headers: {{Accept=*/*, CloudFront-Viewer-Country=NL, Host=api.example.com, User-Agent=curl/8.4.0, X-Correlation-Trace-Id=trace-{request_id}, X-Forwarded-For=1.2.3.4, 10.0.0.1}}"
            ),
        ),
        log_event(
            request_id,
            start + 30,
            &format!("Received response. Status: {status}, Integration latency: 28 ms"),
        ),
        log_event(
            request_id,
            start + 31,
            &format!(
                "Endpoint response headers: {{Date=Sun, 01 Feb 2026 00:00:00 GMT, Content-Type=application/json, Content-Length=27, x-amzn-RequestId=lambda-{request_id}, X-Amz-Executed-Version=$LATEST}}"
            ),
        ),
        log_event(request_id, start + 32, method_response),
        log_event(
            request_id,
            start + 33,
            &format!("Method completed with status: {status}"),
        ),
    ]
}

/// Gzip + base64, the way CloudWatch Logs delivers subscription data.
pub fn encode_awslogs(data: &LogsData) -> String {
    let raw = serde_json::to_vec(data).expect("serialize logs data");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).expect("gzip write");
    let compressed = encoder.finish().expect("gzip finish");
    base64::engine::general_purpose::STANDARD.encode(compressed)
}

/// The Lambda event a subscription filter delivers for `data`.
pub fn awslogs_event(data: &LogsData) -> Value {
    json!({"awslogs": {"data": encode_awslogs(data)}})
}

/// CloudTrail `CreateLogGroup` event as delivered through EventBridge.
pub fn create_log_group_event(log_group: &str) -> Value {
    json!({
        "version": "0",
        "detail-type": "AWS API Call via CloudTrail",
        "source": "aws.logs",
        "account": ACCOUNT_ID,
        "region": "eu-west-1",
        "detail": {
            "eventSource": "logs.amazonaws.com",
            "eventName": "CreateLogGroup",
            "requestParameters": {"logGroupName": log_group},
        },
    })
}

pub fn function_arn(name: &str) -> String {
    format!("arn:aws:lambda:eu-west-1:{ACCOUNT_ID}:function:{name}")
}
