use std::future::Future;

use logship_core::error::{LogshipError, Result};
use logship_core::model::awslogs::{LogEvent, LogsData};
use serde::Serialize;
use serde_json::{Map, Value};

/// Fire-and-forget invocation of another function.
pub trait FunctionInvoker {
    fn invoke_event(
        &self,
        function_name: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// A JSON log line tagged with the request id and timestamp captured by the
/// subscription filter. Fields of the logged object win over both tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ForwardedEvent(pub Map<String, Value>);

pub fn parse_log_event(event: &LogEvent) -> Option<ForwardedEvent> {
    let extracted = event.extracted_fields.as_ref()?;
    let raw = extracted.event.as_deref()?;
    let Ok(Value::Object(data)) = serde_json::from_str::<Value>(raw) else {
        tracing::trace!(id = %event.id, "dropping log line that is not a json object");
        return None;
    };

    let mut out = Map::new();
    if let Some(request_id) = &extracted.request_id {
        out.insert("requestId".into(), Value::String(request_id.clone()));
    }
    if let Some(timestamp) = &extracted.timestamp {
        out.insert("log_timestamp".into(), Value::String(timestamp.clone()));
    }
    out.extend(data);
    Some(ForwardedEvent(out))
}

/// Sends every forwardable event in the batch to `function_name` with one
/// asynchronous invocation and returns how many were sent.
pub async fn forward_batch<I: FunctionInvoker>(
    invoker: &I,
    function_name: &str,
    data: &LogsData,
) -> Result<usize> {
    if data.is_control_message() {
        return Ok(0);
    }

    let events: Vec<ForwardedEvent> = data.log_events.iter().filter_map(parse_log_event).collect();
    tracing::debug!(
        log_group = %data.log_group,
        log_stream = %data.log_stream,
        lines = data.log_events.len(),
        forwarded = events.len(),
        "parsed log events"
    );
    if events.is_empty() {
        return Ok(0);
    }

    let payload = serde_json::to_vec(&events)
        .map_err(|e| LogshipError::Internal(format!("failed encoding forwarded events: {e}")))?;
    invoker.invoke_event(function_name, payload).await?;
    Ok(events.len())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingInvoker {
        calls: Mutex<Vec<(String, Value)>>,
        fail: bool,
    }

    impl FunctionInvoker for RecordingInvoker {
        async fn invoke_event(&self, function_name: &str, payload: Vec<u8>) -> Result<()> {
            if self.fail {
                return Err(LogshipError::Cloud("lambda:Invoke: throttled".into()));
            }
            let payload = serde_json::from_slice(&payload).unwrap();
            self.calls
                .lock()
                .unwrap()
                .push((function_name.to_string(), payload));
            Ok(())
        }
    }

    #[test]
    fn forwarded_event_merges_data_over_tags() {
        let event = testkit::extracted_event("r-1", "2026-02-01T00:00:00.000Z", r#"{"a":1}"#);
        let forwarded = parse_log_event(&event).unwrap();
        assert_eq!(
            serde_json::to_value(forwarded).unwrap(),
            json!({"requestId": "r-1", "log_timestamp": "2026-02-01T00:00:00.000Z", "a": 1})
        );

        let event = testkit::extracted_event("r-1", "ts", r#"{"requestId":"inner","b":true}"#);
        let forwarded = parse_log_event(&event).unwrap();
        assert_eq!(forwarded.0["requestId"], "inner");
        assert_eq!(forwarded.0["log_timestamp"], "ts");
    }

    #[test]
    fn non_objects_are_dropped() {
        for raw in ["not json", "42", "\"text\"", "[1,2]", "null"] {
            let event = testkit::extracted_event("r-1", "ts", raw);
            assert!(parse_log_event(&event).is_none(), "{raw} was forwarded");
        }
        assert!(parse_log_event(&testkit::raw_log_event(1, "{\"a\":1}")).is_none());
    }

    #[tokio::test]
    async fn forwards_batch_in_one_invocation() {
        let data = testkit::logs_data(
            "/aws/lambda/orders",
            vec![
                testkit::extracted_event("r-1", "t1", r#"{"a":1}"#),
                testkit::extracted_event("r-2", "t2", "plain text"),
                testkit::extracted_event("r-3", "t3", r#"{"b":2}"#),
            ],
        );
        let invoker = RecordingInvoker::default();

        let sent = forward_batch(&invoker, "log-processor", &data).await.unwrap();

        assert_eq!(sent, 2);
        let calls = invoker.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "log-processor");
        assert_eq!(
            calls[0].1,
            json!([
                {"requestId": "r-1", "log_timestamp": "t1", "a": 1},
                {"requestId": "r-3", "log_timestamp": "t3", "b": 2},
            ])
        );
    }

    #[tokio::test]
    async fn all_invalid_batch_makes_no_invocation() {
        let data = testkit::logs_data(
            "/aws/lambda/orders",
            vec![
                testkit::extracted_event("r-1", "t1", "START RequestId"),
                testkit::raw_log_event(2, "END RequestId"),
            ],
        );
        let invoker = RecordingInvoker::default();
        assert_eq!(forward_batch(&invoker, "p", &data).await.unwrap(), 0);
        assert!(invoker.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invocation_failure_is_returned() {
        let data = testkit::logs_data(
            "/aws/lambda/orders",
            vec![testkit::extracted_event("r-1", "t1", r#"{"a":1}"#)],
        );
        let invoker = RecordingInvoker {
            fail: true,
            ..RecordingInvoker::default()
        };
        let err = forward_batch(&invoker, "p", &data).await.unwrap_err();
        assert!(matches!(err, LogshipError::Cloud(_)));
    }
}
