use std::fmt;

use logship_core::arn::Arn;
use logship_core::config::Config;
use logship_core::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::{FunctionPermissionsApi, LogGroupsApi, Permission, SubscriptionFilter};

pub const SUBSCRIPTION_FILTER_NAME: &str = "ship-logs";
pub const PERMISSION_STATEMENT_ID: &str = "cloudwatchLogsTrigger";
pub const INVOKE_ACTION: &str = "lambda:InvokeFunction";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeSettings {
    pub destination: Arn,
    pub filter_pattern: String,
    pub processor_function_name: Option<String>,
    pub prefix: Option<String>,
    pub region: String,
}

impl SubscribeSettings {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let destination = cfg.require_destination_arn()?;
        let region = cfg
            .region
            .clone()
            .unwrap_or_else(|| destination.region().to_string());
        Ok(Self {
            filter_pattern: cfg.filter_pattern.clone(),
            processor_function_name: cfg
                .processor_function_name
                .clone()
                .filter(|name| !name.is_empty()),
            prefix: cfg.log_group_prefix.clone(),
            region,
            destination,
        })
    }

    pub fn destination_name(&self) -> &str {
        self.destination.resource_name()
    }

    /// The principal CloudWatch Logs invokes destinations as in this region.
    pub fn logs_principal(&self) -> String {
        format!("logs.{}.amazonaws.com", self.region)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The log group belongs to the destination or the processor itself.
    InvocationLoop,
    PrefixMismatch,
    /// The log group name mentions the destination or the processor.
    RelatedFunction,
    AlreadySubscribed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvocationLoop => "log group of the destination or processor function",
            Self::PrefixMismatch => "log group does not match the configured prefix",
            Self::RelatedFunction => "log group name contains the destination or processor name",
            Self::AlreadySubscribed => "log group already has a subscription filter",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubscribeOutcome {
    Subscribed { permission_added: bool },
    Skipped { reason: SkipReason },
}

#[derive(Debug, Default, Deserialize)]
struct PolicyDocument {
    #[serde(rename = "Statement", default)]
    statement: Vec<PolicyStatement>,
}

#[derive(Debug, Deserialize)]
struct PolicyStatement {
    #[serde(rename = "Sid")]
    sid: Option<String>,
}

/// Whether `policy` already grants CloudWatch Logs the invoke permission.
pub fn policy_has_statement(policy: &str, statement_id: &str) -> bool {
    match serde_json::from_str::<PolicyDocument>(policy) {
        Ok(doc) => doc
            .statement
            .iter()
            .any(|s| s.sid.as_deref() == Some(statement_id)),
        Err(e) => {
            warn!(error = %e, "unreadable function policy; treating permission as missing");
            false
        }
    }
}

/// Decides whether `log_group` should ship to the destination without
/// calling any service.
pub fn precheck(settings: &SubscribeSettings, log_group: &str) -> Option<SkipReason> {
    let destination = settings.destination_name();
    let processor = settings.processor_function_name.as_deref();

    let own_group = |name: &str| log_group == format!("/aws/lambda/{name}");
    if own_group(destination) || processor.is_some_and(own_group) {
        return Some(SkipReason::InvocationLoop);
    }
    if settings
        .prefix
        .as_deref()
        .is_some_and(|prefix| !log_group.starts_with(prefix))
    {
        return Some(SkipReason::PrefixMismatch);
    }
    if log_group.contains(destination) || processor.is_some_and(|p| log_group.contains(p)) {
        return Some(SkipReason::RelatedFunction);
    }
    None
}

pub async fn subscribe_log_group<C>(
    client: &C,
    settings: &SubscribeSettings,
    log_group: &str,
    account_id: &str,
) -> Result<SubscribeOutcome>
where
    C: LogGroupsApi + FunctionPermissionsApi,
{
    if let Some(reason) = precheck(settings, log_group) {
        debug!(log_group, %reason, "skipping log group");
        return Ok(SubscribeOutcome::Skipped { reason });
    }

    let existing = client.subscription_filter_names(log_group).await?;
    if !existing.is_empty() {
        debug!(log_group, filters = ?existing, "skipping already subscribed log group");
        return Ok(SubscribeOutcome::Skipped {
            reason: SkipReason::AlreadySubscribed,
        });
    }

    let permission_added = if settings.destination.is_lambda() {
        ensure_invoke_permission(client, settings, account_id).await?
    } else {
        false
    };

    let filter = SubscriptionFilter {
        log_group_name: log_group.to_string(),
        filter_name: SUBSCRIPTION_FILTER_NAME.to_string(),
        filter_pattern: settings.filter_pattern.clone(),
        destination_arn: settings.destination.as_str().to_string(),
    };
    client.put_subscription_filter(&filter).await?;
    info!(
        log_group,
        destination = %settings.destination,
        filter_pattern = %settings.filter_pattern,
        "subscribed log group"
    );

    Ok(SubscribeOutcome::Subscribed { permission_added })
}

async fn ensure_invoke_permission<C: FunctionPermissionsApi>(
    client: &C,
    settings: &SubscribeSettings,
    account_id: &str,
) -> Result<bool> {
    let function_name = settings.destination.as_str();
    let granted = client
        .get_policy(function_name)
        .await?
        .is_some_and(|policy| policy_has_statement(&policy, PERMISSION_STATEMENT_ID));
    if granted {
        return Ok(false);
    }

    let permission = Permission {
        function_name: function_name.to_string(),
        statement_id: PERMISSION_STATEMENT_ID.to_string(),
        action: INVOKE_ACTION.to_string(),
        principal: settings.logs_principal(),
        source_account: account_id.to_string(),
    };
    debug!(?permission, "adding permission for cloudwatch logs to invoke destination");
    client.add_permission(&permission).await?;
    Ok(true)
}
