use serde::{Deserialize, Serialize};

/// EventBridge delivery of a CloudTrail `CreateLogGroup` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudTrailEvent {
    pub detail: CloudTrailDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudTrailDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    pub request_parameters: LogGroupParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogGroupParameters {
    pub log_group_name: String,
}

impl CloudTrailEvent {
    pub fn log_group_name(&self) -> &str {
        &self.detail.request_parameters.log_group_name
    }
}
