use std::time::Duration;

pub const SLACK_API_URL: &str = "https://slack.com/api";

pub const POST_MESSAGE_PATH: &str = "/chat.postMessage";
pub const UPDATE_MESSAGE_PATH: &str = "/chat.update";

/// Slack error code returned in the body when a method is throttled.
pub const RATELIMITED_ERROR: &str = "ratelimited";

/// Back-off used when Slack throttles without a `Retry-After` hint
/// (Slack allows roughly one message per second per channel).
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);
