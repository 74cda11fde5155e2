use logship_core::config::validate_retention_days;
use logship_core::error::Result;

use crate::api::LogGroupsApi;

pub async fn set_retention_policy<C: LogGroupsApi>(
    client: &C,
    log_group: &str,
    retention_days: i32,
) -> Result<()> {
    let retention_days = validate_retention_days(retention_days)?;

    tracing::info!(log_group, retention_days, "updating log group retention policy");
    client.put_retention_policy(log_group, retention_days).await
}
