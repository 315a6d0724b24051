use serde::{Deserialize, Serialize};

use crate::services::slack::SlackNotification;

/// A notification whose fields are already rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackNotification>,
}

impl Notification {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            slack: None,
        }
    }

    pub fn with_slack(mut self, slack: SlackNotification) -> Self {
        self.slack = Some(slack);
        self
    }
}

/// Where a notification goes: the service name and the service-specific
/// recipient (a Slack channel name or ID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub service: String,
    pub recipient: String,
}

impl Destination {
    pub fn new(service: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            recipient: recipient.into(),
        }
    }
}
