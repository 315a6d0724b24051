use thiserror::Error;

pub type ServiceResult<T> = error_stack::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Failed to unmarshal attachments '{0}'")]
    InvalidAttachments(String),

    #[error("Failed to unmarshal blocks '{0}'")]
    InvalidBlocks(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to deliver notification to {0}")]
    Delivery(String),
}
