use std::io::Read;

use base64::Engine;
use flate2::read::GzDecoder;
use logship_core::error::{LogshipError, Result};
use logship_core::model::awslogs::{AwsLogsEvent, LogsData};

pub fn decode_event(event: &AwsLogsEvent) -> Result<LogsData> {
    decode_awslogs(&event.awslogs.data)
}

pub fn decode_awslogs(data: &str) -> Result<LogsData> {
    let compressed = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| LogshipError::Decode(format!("awslogs data is not base64: {e}")))?;

    let mut json = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut json)
        .map_err(|e| LogshipError::Decode(format!("awslogs data is not gzip: {e}")))?;

    serde_json::from_str(&json)
        .map_err(|e| LogshipError::Decode(format!("awslogs payload is not valid json: {e}")))
}
