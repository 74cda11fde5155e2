//! Removes Lambda log groups left behind by deleted CloudFormation stacks.

use futures::future::join_all;
use logship_core::config::Config;
use logship_core::error::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::api::{LogGroupsApi, StacksApi};

pub const ACTIVE_STACK_STATUSES: &[&str] = &[
    "CREATE_COMPLETE",
    "UPDATE_COMPLETE",
    "UPDATE_ROLLBACK_COMPLETE",
    "UPDATE_IN_PROGRESS",
    "CREATE_IN_PROGRESS",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneOptions {
    pub prefix: String,
    pub page_size: i32,
    pub dry_run: bool,
}

impl PruneOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            prefix: cfg.prune_prefix.clone(),
            page_size: cfg.prune_page_size,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub dry_run: bool,
    pub active_stacks: usize,
    pub scanned: usize,
    pub old: Vec<String>,
    pub deleted: Vec<String>,
    pub failed: Vec<FailedDeletion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDeletion {
    pub log_group: String,
    pub error: String,
}

/// `/aws/lambda/{function}` → `function`.
pub fn function_segment(log_group: &str) -> Option<&str> {
    log_group.split('/').nth(3)
}

/// A log group is old when its function name starts with none of the active
/// stack names. Groups outside the `/aws/lambda/{function}` shape are never
/// old.
pub fn is_old(log_group: &str, active_stacks: &[String]) -> bool {
    let Some(function) = function_segment(log_group) else {
        return false;
    };
    !active_stacks
        .iter()
        .any(|stack| function.starts_with(stack.as_str()))
}

pub async fn list_log_groups<C: LogGroupsApi>(
    client: &C,
    prefix: &str,
    page_size: i32,
) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut next_token = None;
    loop {
        let page = client
            .describe_log_groups(prefix, page_size, next_token)
            .await?;
        names.extend(page.log_group_names);
        next_token = page.next_token;
        if next_token.is_none() {
            break;
        }
    }
    Ok(names)
}

pub async fn prune_log_groups<C>(client: &C, opts: &PruneOptions) -> Result<PruneReport>
where
    C: LogGroupsApi + StacksApi,
{
    let stacks = client.list_stack_names(ACTIVE_STACK_STATUSES).await?;
    let groups = list_log_groups(client, &opts.prefix, opts.page_size).await?;
    let old: Vec<String> = groups
        .iter()
        .filter(|group| is_old(group, &stacks))
        .cloned()
        .collect();

    info!(
        active_stacks = stacks.len(),
        scanned = groups.len(),
        old = old.len(),
        dry_run = opts.dry_run,
        "deleting old log groups"
    );

    let mut report = PruneReport {
        dry_run: opts.dry_run,
        active_stacks: stacks.len(),
        scanned: groups.len(),
        ..PruneReport::default()
    };
    if opts.dry_run {
        report.old = old;
        return Ok(report);
    }

    let results = join_all(
        old.iter()
            .map(|group| async move { (group, client.delete_log_group(group).await) }),
    )
    .await;

    for (group, result) in results {
        match result {
            Ok(()) => report.deleted.push(group.clone()),
            Err(e) => {
                warn!(log_group = %group, error = %e, "failed deleting log group");
                report.failed.push(FailedDeletion {
                    log_group: group.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    report.old = old;
    Ok(report)
}
