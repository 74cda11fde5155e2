use std::io::Write;

use logship_core::error::Result;
use logship_core::model::awslogs::{AwsLogsEvent, LogsData};
use logship_core::model::raw::RawFields;
use serde::Serialize;
use tracing::{debug, warn};

use crate::classify::classify_fields;
use crate::decode::decode_event;
use crate::emit::Emitter;
use crate::parser::{ParserConfig, parse_logs};

/// Per-batch counts, reported in diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub records: usize,
    pub emitted: usize,
    pub suppressed: usize,
    pub failed: usize,
}

/// Decodes a subscription event and structures its batch.
///
/// A payload that cannot be decoded fails the whole invocation.
pub fn structure_event<W: Write>(
    event: &AwsLogsEvent,
    parser: &ParserConfig,
    emitter: &mut Emitter<W>,
) -> Result<BatchSummary> {
    let data = decode_event(event)?;
    structure_batch(&data, parser, emitter)
}

pub fn structure_batch<W: Write>(
    data: &LogsData,
    parser: &ParserConfig,
    emitter: &mut Emitter<W>,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    if data.is_control_message() {
        debug!(log_group = %data.log_group, "skipping control message");
        return Ok(summary);
    }

    let already_written = emitter.written();
    for fields in parse_logs(parser, data) {
        summary.records += 1;
        let request_id = field_str(&fields, "request_id");
        let api_stage = field_str(&fields, "api_stage");

        match classify_fields(fields) {
            Ok(Some(event)) => {
                debug!(
                    request_id = ?request_id,
                    level = ?event.level(),
                    status_code = ?event.status_code(),
                    "emitting structured event"
                );
                emitter.emit(&event)?;
            }
            Ok(None) => summary.suppressed += 1,
            Err(e) => {
                warn!(
                    error = %e,
                    request_id = ?request_id,
                    api_stage = ?api_stage,
                    "skipping unparseable log record"
                );
                summary.failed += 1;
            }
        }
    }
    summary.emitted = emitter.written() - already_written;

    debug!(
        log_group = %data.log_group,
        records = summary.records,
        emitted = summary.emitted,
        suppressed = summary.suppressed,
        failed = summary.failed,
        "structured api gateway batch"
    );
    Ok(summary)
}

fn field_str(fields: &RawFields, key: &str) -> Option<String> {
    fields.get(key).and_then(|v| v.as_str()).map(str::to_string)
}
