use std::time::Duration;

use thiserror::Error;

pub type ModelResult<T> = error_stack::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Reqwest error: {0}")]
    ReqwestError(String),

    #[error("Slack API error: {0}")]
    SlackApi(String),

    #[error("Rate limit exceeded, retry after {0:?}")]
    RatelimitExceeded(Option<Duration>),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Serde deserialize error: {0}")]
    SerdeDeserialize(String),

    #[error("Unknown error")]
    Unknown,
}
