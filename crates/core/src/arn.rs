use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LogshipError, Result};

/// An Amazon Resource Name, `arn:partition:service:region:account:resource`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arn {
    raw: String,
    partition: String,
    service: String,
    region: String,
    account_id: String,
    resource: String,
}

impl Arn {
    pub fn parse(input: &str) -> Result<Self> {
        let mut parts = input.splitn(6, ':');
        let (Some("arn"), Some(partition), Some(service), Some(region), Some(account), Some(resource)) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(LogshipError::Parse(format!("invalid arn: {input}")));
        };
        if partition.is_empty() || service.is_empty() || resource.is_empty() {
            return Err(LogshipError::Parse(format!("invalid arn: {input}")));
        }

        Ok(Self {
            raw: input.to_string(),
            partition: partition.to_string(),
            service: service.to_string(),
            region: region.to_string(),
            account_id: account.to_string(),
            resource: resource.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Last `:`-separated segment: the function name of
    /// `arn:aws:lambda:…:function:ship-logs`, the stream of a Kinesis ARN.
    pub fn resource_name(&self) -> &str {
        self.raw.rsplit(':').next().unwrap_or(&self.resource)
    }

    pub fn is_lambda(&self) -> bool {
        self.service == "lambda"
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
