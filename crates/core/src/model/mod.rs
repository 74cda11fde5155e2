pub mod awslogs;
pub mod cloudtrail;
pub mod event;
pub mod raw;
