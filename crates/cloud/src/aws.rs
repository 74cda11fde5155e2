use std::error::Error;
use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cloudformation::types::StackStatus;
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use logship_core::config::Config;
use logship_core::error::{LogshipError, Result};
use logship_ingest::forward::FunctionInvoker;

use crate::api::{
    FunctionPermissionsApi, LogGroupPage, LogGroupsApi, Permission, StacksApi, SubscriptionFilter,
};

/// SDK clients for every service logship talks to, sharing one loaded
/// configuration.
#[derive(Debug, Clone)]
pub struct AwsClients {
    pub logs: aws_sdk_cloudwatchlogs::Client,
    pub lambda: aws_sdk_lambda::Client,
    pub cloudformation: aws_sdk_cloudformation::Client,
}

impl AwsClients {
    pub async fn from_config(cfg: &Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &cfg.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;
        Self::from_sdk_config(&sdk_config, cfg.invoke_timeout)
    }

    pub fn from_sdk_config(sdk_config: &SdkConfig, invoke_timeout: Duration) -> Self {
        // Bounds each attempt of the processor invocation.
        let lambda_config = aws_sdk_lambda::config::Builder::from(sdk_config)
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_attempt_timeout(invoke_timeout)
                    .build(),
            )
            .build();

        Self {
            logs: aws_sdk_cloudwatchlogs::Client::new(sdk_config),
            lambda: aws_sdk_lambda::Client::from_conf(lambda_config),
            cloudformation: aws_sdk_cloudformation::Client::new(sdk_config),
        }
    }
}

fn cloud_error(operation: &str, err: impl Error) -> LogshipError {
    LogshipError::Cloud(format!("{operation}: {}", DisplayErrorContext(err)))
}

impl LogGroupsApi for AwsClients {
    async fn describe_log_groups(
        &self,
        prefix: &str,
        limit: i32,
        next_token: Option<String>,
    ) -> Result<LogGroupPage> {
        let out = self
            .logs
            .describe_log_groups()
            .log_group_name_prefix(prefix)
            .limit(limit)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| cloud_error("logs:DescribeLogGroups", e))?;

        Ok(LogGroupPage {
            log_group_names: out
                .log_groups()
                .iter()
                .filter_map(|group| group.log_group_name())
                .map(str::to_string)
                .collect(),
            next_token: out.next_token().map(str::to_string),
        })
    }

    async fn delete_log_group(&self, log_group_name: &str) -> Result<()> {
        self.logs
            .delete_log_group()
            .log_group_name(log_group_name)
            .send()
            .await
            .map_err(|e| cloud_error("logs:DeleteLogGroup", e))?;
        Ok(())
    }

    async fn subscription_filter_names(&self, log_group_name: &str) -> Result<Vec<String>> {
        let out = self
            .logs
            .describe_subscription_filters()
            .log_group_name(log_group_name)
            .send()
            .await
            .map_err(|e| cloud_error("logs:DescribeSubscriptionFilters", e))?;
        Ok(out
            .subscription_filters()
            .iter()
            .map(|filter| filter.filter_name().unwrap_or_default().to_string())
            .collect())
    }

    async fn put_subscription_filter(&self, filter: &SubscriptionFilter) -> Result<()> {
        self.logs
            .put_subscription_filter()
            .log_group_name(&filter.log_group_name)
            .filter_name(&filter.filter_name)
            .filter_pattern(&filter.filter_pattern)
            .destination_arn(&filter.destination_arn)
            .send()
            .await
            .map_err(|e| cloud_error("logs:PutSubscriptionFilter", e))?;
        Ok(())
    }

    async fn put_retention_policy(
        &self,
        log_group_name: &str,
        retention_in_days: i32,
    ) -> Result<()> {
        self.logs
            .put_retention_policy()
            .log_group_name(log_group_name)
            .retention_in_days(retention_in_days)
            .send()
            .await
            .map_err(|e| cloud_error("logs:PutRetentionPolicy", e))?;
        Ok(())
    }
}

impl FunctionPermissionsApi for AwsClients {
    async fn get_policy(&self, function_name: &str) -> Result<Option<String>> {
        match self.lambda.get_policy().function_name(function_name).send().await {
            Ok(out) => Ok(out.policy().map(str::to_string)),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(e) => Err(cloud_error("lambda:GetPolicy", e)),
        }
    }

    async fn add_permission(&self, permission: &Permission) -> Result<()> {
        self.lambda
            .add_permission()
            .function_name(&permission.function_name)
            .statement_id(&permission.statement_id)
            .action(&permission.action)
            .principal(&permission.principal)
            .source_account(&permission.source_account)
            .send()
            .await
            .map_err(|e| cloud_error("lambda:AddPermission", e))?;
        Ok(())
    }
}

impl StacksApi for AwsClients {
    async fn list_stack_names(&self, statuses: &[&str]) -> Result<Vec<String>> {
        let filter: Vec<StackStatus> = statuses.iter().map(|s| StackStatus::from(*s)).collect();
        let mut pages = self
            .cloudformation
            .list_stacks()
            .set_stack_status_filter(Some(filter))
            .into_paginator()
            .send();

        let mut names = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| cloud_error("cloudformation:ListStacks", e))?;
            names.extend(
                page.stack_summaries()
                    .iter()
                    .filter_map(|stack| stack.stack_name())
                    .map(str::to_string),
            );
        }
        Ok(names)
    }
}

impl FunctionInvoker for AwsClients {
    async fn invoke_event(&self, function_name: &str, payload: Vec<u8>) -> Result<()> {
        let out = self
            .lambda
            .invoke()
            .function_name(function_name)
            .invocation_type(InvocationType::Event)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| cloud_error("lambda:Invoke", e))?;
        tracing::debug!(
            function = %function_name,
            status = out.status_code(),
            "queued asynchronous invocation"
        );
        Ok(())
    }
}
