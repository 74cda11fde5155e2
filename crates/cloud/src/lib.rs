pub mod api;
pub mod aws;
pub mod prune;
pub mod retention;
pub mod subscribe;

pub use api::{
    FunctionPermissionsApi, LogGroupPage, LogGroupsApi, Permission, StacksApi, SubscriptionFilter,
};
pub use aws::AwsClients;
