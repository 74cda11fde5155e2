use anyhow::Context;
use clap::ValueEnum;
use logship_cloud::AwsClients;
use logship_cloud::retention::set_retention_policy;
use logship_cloud::subscribe::{SubscribeSettings, subscribe_log_group};
use logship_core::arn::Arn;
use logship_core::config::Config;
use logship_core::model::awslogs::AwsLogsEvent;
use logship_core::model::cloudtrail::CloudTrailEvent;
use logship_ingest::decode::decode_event;
use logship_ingest::emit::Emitter;
use logship_ingest::forward::forward_batch;
use logship_ingest::parser::ParserConfig;
use logship_ingest::pipeline::structure_event;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Function {
    /// Emit structured events for failed, throttled or debug-traced API
    /// Gateway requests.
    StructureApiGatewayLogs,
    /// Forward JSON log lines to the processor function.
    ProcessLogs,
    /// Subscribe a newly created log group to the destination.
    SubscribeToLogs,
    /// Put the configured retention policy on a newly created log group.
    SetLogGroupRetentionPolicy,
}

impl Function {
    /// Resolves a Lambda `_HANDLER` value such as `subscribe-to-logs` or
    /// `functions/subscribe-to-logs.handler`.
    pub fn from_handler(handler: &str) -> Option<Self> {
        let name = handler.trim();
        let name = name.strip_suffix(".handler").unwrap_or(name);
        let name = name.rsplit('/').next().unwrap_or(name);
        Self::from_str(name, true).ok()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::StructureApiGatewayLogs => "structure-api-gateway-logs",
            Self::ProcessLogs => "process-logs",
            Self::SubscribeToLogs => "subscribe-to-logs",
            Self::SetLogGroupRetentionPolicy => "set-log-group-retention-policy",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub request_id: String,
    pub invoked_function_arn: Option<String>,
}

/// Runs one function on one event. AWS clients are built on first use, so
/// structuring API Gateway logs never needs credentials.
pub struct Handlers {
    config: Config,
    parser: ParserConfig,
    clients: OnceCell<AwsClients>,
}

impl Handlers {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            parser: ParserConfig::default(),
            clients: OnceCell::new(),
        }
    }

    async fn clients(&self) -> &AwsClients {
        self.clients
            .get_or_init(|| AwsClients::from_config(&self.config))
            .await
    }

    pub async fn handle(
        &self,
        function: Function,
        event: Value,
        ctx: &InvocationContext,
    ) -> anyhow::Result<Value> {
        match function {
            Function::StructureApiGatewayLogs => {
                let event: AwsLogsEvent =
                    serde_json::from_value(event).context("decode awslogs event")?;
                let mut emitter = Emitter::stdout();
                let summary = structure_event(&event, &self.parser, &mut emitter)?;
                info!(
                    request_id = %ctx.request_id,
                    records = summary.records,
                    emitted = summary.emitted,
                    suppressed = summary.suppressed,
                    failed = summary.failed,
                    "structured api gateway logs"
                );
                Ok(Value::Null)
            }
            Function::ProcessLogs => {
                let processor = self.config.require_processor_function_name()?;
                let event: AwsLogsEvent =
                    serde_json::from_value(event).context("decode awslogs event")?;
                let data = decode_event(&event)?;
                let forwarded = forward_batch(self.clients().await, processor, &data).await?;
                info!(
                    request_id = %ctx.request_id,
                    log_group = %data.log_group,
                    forwarded,
                    processor,
                    "forwarded log events"
                );
                Ok(json!({ "forwarded": forwarded }))
            }
            Function::SubscribeToLogs => {
                let settings = SubscribeSettings::from_config(&self.config)?;
                let event: CloudTrailEvent =
                    serde_json::from_value(event).context("decode cloudtrail event")?;
                let invoked = ctx
                    .invoked_function_arn
                    .as_deref()
                    .context("invoked function arn is required to subscribe log groups")?;
                let account_id = Arn::parse(invoked)?.account_id().to_string();
                let outcome = subscribe_log_group(
                    self.clients().await,
                    &settings,
                    event.log_group_name(),
                    &account_id,
                )
                .await?;
                Ok(serde_json::to_value(outcome)?)
            }
            Function::SetLogGroupRetentionPolicy => {
                let retention_days = self.config.require_retention_days()?;
                let event: CloudTrailEvent =
                    serde_json::from_value(event).context("decode cloudtrail event")?;
                set_retention_policy(self.clients().await, event.log_group_name(), retention_days)
                    .await?;
                Ok(json!({
                    "log_group": event.log_group_name(),
                    "retention_days": retention_days,
                }))
            }
        }
    }
}
