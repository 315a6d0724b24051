use async_trait::async_trait;

use crate::error::ModelResult;

use super::options::MessageOption;

/// Channel and timestamp of a message Slack accepted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

/// Performs a `chat.postMessage` or `chat.update` call.
///
/// Implementations report throttling as
/// [`Error::RatelimitExceeded`](crate::error::Error::RatelimitExceeded); the
/// delivery engine retries on that context only.
#[async_trait]
pub trait SlackTransport: Send + Sync {
    async fn send_message(
        &self,
        channel: &str,
        options: &[MessageOption],
    ) -> ModelResult<PostedMessage>;
}
