use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SlackResponse {
    #[serde(untagged)]
    Message(MessageResponse),
    #[serde(untagged)]
    Error(SlackError),
    #[serde(untagged)]
    UnknownResponse(Value),
}

/// Body of a successful `chat.postMessage` or `chat.update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub ok: bool,
    pub channel: String,
    pub ts: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackError {
    pub ok: bool,
    pub error: String,
}
