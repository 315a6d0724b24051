use serde_json::Value;

/// One rendering directive of a Slack message.
///
/// Options are applied in order, a later option overriding an earlier one
/// that sets the same field. The delivery engine only ever appends
/// `ThreadTs`, `Broadcast`, `Post` and `Update`.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOption {
    Text(String),
    Username(String),
    IconEmoji(String),
    IconUrl(String),
    Attachments(Vec<Value>),
    Blocks(Vec<Value>),
    DisableLinkUnfurl,
    /// Reply in the thread whose parent has this timestamp.
    ThreadTs(String),
    /// Also show a thread reply in the channel.
    Broadcast,
    /// Send through `chat.postMessage`.
    Post,
    /// Send through `chat.update`, editing the message at `ts`.
    Update { ts: String },
}

/// Timestamp targeted by the last `Update` option, if any.
pub fn update_target(options: &[MessageOption]) -> Option<&str> {
    let method = options
        .iter()
        .rev()
        .find(|option| matches!(option, MessageOption::Post | MessageOption::Update { .. }));
    match method {
        Some(MessageOption::Update { ts }) => Some(ts),
        _ => None,
    }
}
