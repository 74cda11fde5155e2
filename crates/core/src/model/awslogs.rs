use serde::{Deserialize, Serialize};

pub const CONTROL_MESSAGE: &str = "CONTROL_MESSAGE";

/// Lambda event delivered by a CloudWatch Logs subscription filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwsLogsEvent {
    pub awslogs: AwsLogsPayload,
}

/// Base64 encoded, gzip compressed [`LogsData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwsLogsPayload {
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsData {
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub owner: String,
    pub log_group: String,
    pub log_stream: String,
    #[serde(default)]
    pub subscription_filters: Vec<String>,
    #[serde(default)]
    pub log_events: Vec<LogEvent>,
}

impl LogsData {
    pub fn is_control_message(&self) -> bool {
        self.message_type == CONTROL_MESSAGE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    #[serde(default)]
    pub id: String,
    pub timestamp: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_fields: Option<ExtractedFields>,
}

/// Fields captured by a space-delimited filter pattern such as
/// `[timestamp, request_id, event]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}
