#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use logship_cloud::{
    FunctionPermissionsApi, LogGroupPage, LogGroupsApi, Permission, StacksApi, SubscriptionFilter,
};
use logship_core::LogshipError;
use logship_core::error::Result;

/// In-memory CloudWatch Logs, Lambda and CloudFormation.
#[derive(Default)]
pub struct FakeCloud {
    pub state: Mutex<State>,
}

#[derive(Default)]
pub struct State {
    pub log_groups: Vec<String>,
    pub filters: BTreeMap<String, Vec<String>>,
    pub policies: BTreeMap<String, String>,
    pub stacks: Vec<(String, String)>,
    pub failing_deletes: BTreeSet<String>,

    pub page_requests: Vec<(String, i32, Option<String>)>,
    pub deleted: Vec<String>,
    pub put_filters: Vec<SubscriptionFilter>,
    pub permissions: Vec<Permission>,
    pub retention: Vec<(String, i32)>,
}

impl FakeCloud {
    pub fn with_log_groups(groups: &[&str]) -> Self {
        let cloud = Self::default();
        cloud.state().log_groups = groups.iter().map(|g| g.to_string()).collect();
        cloud
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_stack(&self, name: &str, status: &str) {
        self.state()
            .stacks
            .push((name.to_string(), status.to_string()));
    }
}

impl LogGroupsApi for FakeCloud {
    async fn describe_log_groups(
        &self,
        prefix: &str,
        limit: i32,
        next_token: Option<String>,
    ) -> Result<LogGroupPage> {
        let mut state = self.state();
        state
            .page_requests
            .push((prefix.to_string(), limit, next_token.clone()));

        let start: usize = next_token.map_or(0, |t| t.parse().unwrap());
        let matching: Vec<String> = state
            .log_groups
            .iter()
            .filter(|g| g.starts_with(prefix))
            .cloned()
            .collect();
        let end = (start + limit as usize).min(matching.len());
        Ok(LogGroupPage {
            log_group_names: matching[start..end].to_vec(),
            next_token: (end < matching.len()).then(|| end.to_string()),
        })
    }

    async fn delete_log_group(&self, log_group_name: &str) -> Result<()> {
        let mut state = self.state();
        if state.failing_deletes.contains(log_group_name) {
            return Err(LogshipError::Cloud(format!(
                "logs:DeleteLogGroup: OperationAbortedException for {log_group_name}"
            )));
        }
        state.log_groups.retain(|g| g != log_group_name);
        state.deleted.push(log_group_name.to_string());
        Ok(())
    }

    async fn subscription_filter_names(&self, log_group_name: &str) -> Result<Vec<String>> {
        Ok(self
            .state()
            .filters
            .get(log_group_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_subscription_filter(&self, filter: &SubscriptionFilter) -> Result<()> {
        let mut state = self.state();
        state
            .filters
            .entry(filter.log_group_name.clone())
            .or_default()
            .push(filter.filter_name.clone());
        state.put_filters.push(filter.clone());
        Ok(())
    }

    async fn put_retention_policy(
        &self,
        log_group_name: &str,
        retention_in_days: i32,
    ) -> Result<()> {
        self.state()
            .retention
            .push((log_group_name.to_string(), retention_in_days));
        Ok(())
    }
}

impl FunctionPermissionsApi for FakeCloud {
    async fn get_policy(&self, function_name: &str) -> Result<Option<String>> {
        Ok(self.state().policies.get(function_name).cloned())
    }

    async fn add_permission(&self, permission: &Permission) -> Result<()> {
        let mut state = self.state();
        state.policies.insert(
            permission.function_name.clone(),
            format!(
                r#"{{"Version":"2012-10-17","Statement":[{{"Sid":"{}"}}]}}"#,
                permission.statement_id
            ),
        );
        state.permissions.push(permission.clone());
        Ok(())
    }
}

impl StacksApi for FakeCloud {
    async fn list_stack_names(&self, statuses: &[&str]) -> Result<Vec<String>> {
        Ok(self
            .state()
            .stacks
            .iter()
            .filter(|(_, status)| statuses.contains(&status.as_str()))
            .map(|(name, _)| name.clone())
            .collect())
    }
}
