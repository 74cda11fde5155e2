mod common;

use common::FakeCloud;
use logship_cloud::prune::{PruneOptions, list_log_groups, prune_log_groups};

fn options(dry_run: bool) -> PruneOptions {
    PruneOptions {
        prefix: "/aws/lambda".to_string(),
        page_size: 2,
        dry_run,
    }
}

fn cloud() -> FakeCloud {
    let cloud = FakeCloud::with_log_groups(&[
        "/aws/lambda/orders-dev-get",
        "/aws/lambda/orders-dev-put",
        "/aws/lambda/legacy-api-handler",
        "/aws/lambda/deleted-stack-fn",
        "/aws/lambda",
        "/ecs/unrelated",
    ]);
    cloud.add_stack("orders-dev", "UPDATE_COMPLETE");
    cloud.add_stack("deleted-stack", "DELETE_COMPLETE");
    cloud
}

#[tokio::test]
async fn lists_every_page() {
    let cloud = cloud();
    let groups = list_log_groups(&cloud, "/aws/lambda", 2).await.unwrap();

    assert_eq!(groups.len(), 5);
    let state = cloud.state();
    let requests = &state.page_requests;
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0], ("/aws/lambda".to_string(), 2, None));
    assert_eq!(requests[1].2.as_deref(), Some("2"));
}

#[tokio::test]
async fn deletes_groups_without_active_stack() {
    let cloud = cloud();
    let report = prune_log_groups(&cloud, &options(false)).await.unwrap();

    assert_eq!(report.active_stacks, 1);
    assert_eq!(report.scanned, 5);
    assert_eq!(
        report.old,
        vec![
            "/aws/lambda/legacy-api-handler".to_string(),
            "/aws/lambda/deleted-stack-fn".to_string(),
        ]
    );
    assert_eq!(report.deleted, report.old);
    assert!(report.failed.is_empty());

    let state = cloud.state();
    assert!(state.log_groups.contains(&"/aws/lambda/orders-dev-get".to_string()));
    assert!(state.log_groups.contains(&"/aws/lambda".to_string()));
    assert!(state.log_groups.contains(&"/ecs/unrelated".to_string()));
}

#[tokio::test]
async fn dry_run_deletes_nothing() {
    let cloud = cloud();
    let report = prune_log_groups(&cloud, &options(true)).await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.old.len(), 2);
    assert!(report.deleted.is_empty());
    assert!(cloud.state().deleted.is_empty());
}

#[tokio::test]
async fn failed_deletion_does_not_stop_the_rest() {
    let cloud = cloud();
    cloud
        .state()
        .failing_deletes
        .insert("/aws/lambda/legacy-api-handler".to_string());

    let report = prune_log_groups(&cloud, &options(false)).await.unwrap();

    assert_eq!(report.deleted, vec!["/aws/lambda/deleted-stack-fn".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].log_group, "/aws/lambda/legacy-api-handler");
    assert!(report.failed[0].error.contains("OperationAborted"));
}
