pub mod arn;
pub mod config;
pub mod error;
pub mod model;

pub use error::{LogshipError, Result};
