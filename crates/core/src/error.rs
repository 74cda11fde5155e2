use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogshipError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("cloud api error: {0}")]
    Cloud(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for LogshipError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LogshipError>;
