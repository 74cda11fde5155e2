//! The slices of CloudWatch Logs, Lambda and CloudFormation the handlers use.
//!
//! [`crate::AwsClients`] implements these against the AWS SDK; tests use
//! in-memory fakes.

use std::future::Future;

use logship_core::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogGroupPage {
    pub log_group_names: Vec<String>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub log_group_name: String,
    pub filter_name: String,
    pub filter_pattern: String,
    pub destination_arn: String,
}

/// A resource-based policy statement granting `principal` the `action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub function_name: String,
    pub statement_id: String,
    pub action: String,
    pub principal: String,
    pub source_account: String,
}

pub trait LogGroupsApi {
    fn describe_log_groups(
        &self,
        prefix: &str,
        limit: i32,
        next_token: Option<String>,
    ) -> impl Future<Output = Result<LogGroupPage>> + Send;

    fn delete_log_group(&self, log_group_name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Names of the subscription filters already on the log group.
    fn subscription_filter_names(
        &self,
        log_group_name: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    fn put_subscription_filter(
        &self,
        filter: &SubscriptionFilter,
    ) -> impl Future<Output = Result<()>> + Send;

    fn put_retention_policy(
        &self,
        log_group_name: &str,
        retention_in_days: i32,
    ) -> impl Future<Output = Result<()>> + Send;
}

pub trait FunctionPermissionsApi {
    /// The function's resource policy document, `None` when it has none.
    fn get_policy(
        &self,
        function_name: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    fn add_permission(&self, permission: &Permission) -> impl Future<Output = Result<()>> + Send;
}

pub trait StacksApi {
    /// Names of all stacks currently in one of `statuses`, across pages.
    fn list_stack_names(
        &self,
        statuses: &[&str],
    ) -> impl Future<Output = Result<Vec<String>>> + Send;
}
