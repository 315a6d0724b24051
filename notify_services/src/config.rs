//! Loading [`SlackOptions`] from environment variables.

use error_stack::report;

use crate::{
    error::{Error, ServiceResult},
    services::slack::SlackOptions,
};

pub const SLACK_TOKEN: &str = "SLACK_TOKEN";
pub const SLACK_USERNAME: &str = "SLACK_USERNAME";
pub const SLACK_ICON: &str = "SLACK_ICON";
pub const SLACK_SIGNING_SECRET: &str = "SLACK_SIGNING_SECRET";
pub const SLACK_CHANNELS: &str = "SLACK_CHANNELS";
pub const SLACK_API_URL: &str = "SLACK_API_URL";
pub const SLACK_INSECURE_SKIP_VERIFY: &str = "SLACK_INSECURE_SKIP_VERIFY";
pub const SLACK_DISABLE_UNFURL: &str = "SLACK_DISABLE_UNFURL";

impl SlackOptions {
    pub fn from_env() -> ServiceResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds options from any key lookup; `SLACK_TOKEN` is required.
    pub fn from_lookup<F>(lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).unwrap_or_default();

        let token = get(SLACK_TOKEN);
        if token.is_empty() {
            return Err(report!(Error::Config(format!(
                "{SLACK_TOKEN} environment variable is not set"
            ))));
        }

        let channels = get(SLACK_CHANNELS)
            .split(',')
            .map(str::trim)
            .filter(|channel| !channel.is_empty())
            .map(str::to_string)
            .collect();

        Ok(SlackOptions {
            username: get(SLACK_USERNAME),
            icon: get(SLACK_ICON),
            token,
            signing_secret: get(SLACK_SIGNING_SECRET),
            channels,
            insecure_skip_verify: parse_bool(SLACK_INSECURE_SKIP_VERIFY, &get(SLACK_INSECURE_SKIP_VERIFY))?,
            api_url: get(SLACK_API_URL),
            disable_unfurl: parse_bool(SLACK_DISABLE_UNFURL, &get(SLACK_DISABLE_UNFURL))?,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> ServiceResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" => Ok(false),
        "true" | "1" | "yes" => Ok(true),
        other => Err(report!(Error::Config(format!(
            "{key} must be a boolean, got '{other}'"
        )))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_token_is_required() {
        let err = SlackOptions::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err.current_context(), Error::Config(_)));

        let err = SlackOptions::from_lookup(lookup(&[(SLACK_TOKEN, "  ")])).unwrap_err();
        assert!(matches!(err.current_context(), Error::Config(_)));
    }

    #[test]
    fn test_full_options() {
        let options = SlackOptions::from_lookup(lookup(&[
            (SLACK_TOKEN, "xoxb-123"),
            (SLACK_USERNAME, "notifier"),
            (SLACK_ICON, ":bell:"),
            (SLACK_CHANNELS, "#alerts, #ops,,"),
            (SLACK_API_URL, "http://localhost:9000/api"),
            (SLACK_INSECURE_SKIP_VERIFY, "TRUE"),
            (SLACK_DISABLE_UNFURL, "1"),
        ]))
        .unwrap();

        assert_eq!(options.token, "xoxb-123");
        assert_eq!(options.username, "notifier");
        assert_eq!(options.icon, ":bell:");
        assert_eq!(options.channels, vec!["#alerts", "#ops"]);
        assert_eq!(options.api_url, "http://localhost:9000/api");
        assert!(options.insecure_skip_verify);
        assert!(options.disable_unfurl);
        assert_eq!(options.signing_secret, "");
    }

    #[test]
    fn test_invalid_bool() {
        let err = SlackOptions::from_lookup(lookup(&[
            (SLACK_TOKEN, "xoxb-123"),
            (SLACK_DISABLE_UNFURL, "maybe"),
        ]))
        .unwrap_err();
        assert_eq!(
            err.current_context(),
            &Error::Config("SLACK_DISABLE_UNFURL must be a boolean, got 'maybe'".to_string())
        );
    }
}
