//! Slack notification service.
//!
//! Turns a rendered [`Notification`] into Slack message options and hands
//! them to the threaded client, which owns the thread bookkeeping shared by
//! every send of this service.

use std::sync::Arc;

use error_stack::{ResultExt, report};
use notify_core::{
    network::AdaptiveRateLimiter,
    slack::{
        DeliveryPolicy, MessageOption, SlackApiTransport, SlackTransport, ThreadState,
        ThreadedClient,
    },
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    error::{Error, ServiceResult},
    notification::{Destination, Notification},
};

static VALID_ICON_EMOJI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:.+:$").expect("icon emoji regex is valid")); // Safe unwrap

/// Configuration of one Slack service instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlackOptions {
    pub username: String,
    pub icon: String,
    pub token: String,
    pub signing_secret: String,
    pub channels: Vec<String>,
    pub insecure_skip_verify: bool,
    #[serde(rename = "apiURL")]
    pub api_url: String,
    pub disable_unfurl: bool,
}

/// Slack-specific fields of a notification, already rendered.
///
/// `attachments` and `blocks` hold JSON arrays in Slack's own format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlackNotification {
    pub attachments: String,
    pub blocks: String,
    pub grouping_key: String,
    pub notify_broadcast: bool,
    pub delivery_policy: DeliveryPolicy,
}

/// Builds the ordered option list for a notification.
///
/// Returns the options together with the notification's Slack fields
/// (defaults when it has none).
pub fn build_message_options(
    notification: &Notification,
    options: &SlackOptions,
) -> ServiceResult<(Vec<MessageOption>, SlackNotification)> {
    let mut msg_options = vec![MessageOption::Text(notification.message.clone())];

    if !options.username.is_empty() {
        msg_options.push(MessageOption::Username(options.username.clone()));
    }

    if !options.icon.is_empty() {
        if VALID_ICON_EMOJI.is_match(&options.icon) {
            msg_options.push(MessageOption::IconEmoji(options.icon.clone()));
        } else if is_valid_icon_url(&options.icon) {
            msg_options.push(MessageOption::IconUrl(options.icon.clone()));
        } else {
            tracing::warn!(
                icon = %options.icon,
                "Icon provided is neither a valid emoji nor a valid URL"
            );
        }
    }

    if options.disable_unfurl {
        msg_options.push(MessageOption::DisableLinkUnfurl);
    }

    let Some(slack) = &notification.slack else {
        return Ok((msg_options, SlackNotification::default()));
    };

    let attachments = parse_json_array(&slack.attachments)
        .change_context_lazy(|| Error::InvalidAttachments(slack.attachments.clone()))?;
    let blocks = parse_json_array(&slack.blocks)
        .change_context_lazy(|| Error::InvalidBlocks(slack.blocks.clone()))?;
    msg_options.push(MessageOption::Attachments(attachments));
    msg_options.push(MessageOption::Blocks(blocks));

    Ok((msg_options, slack.clone()))
}

fn is_valid_icon_url(icon: &str) -> bool {
    match Url::parse(icon) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// Empty input is an empty list.
fn parse_json_array(raw: &str) -> Result<Vec<Value>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
}

/// Fresh thread bookkeeping with an open rate limiter.
pub fn new_state() -> Arc<ThreadState> {
    Arc::new(ThreadState::new(Arc::new(AdaptiveRateLimiter::unlimited())))
}

#[derive(Debug, Clone)]
pub struct SlackService {
    options: SlackOptions,
    client: ThreadedClient,
}

impl SlackService {
    /// Talks to the Slack Web API with `options.token`.
    pub fn new(options: SlackOptions) -> ServiceResult<Self> {
        if options.token.is_empty() {
            return Err(report!(Error::Config("Slack token is empty".to_string())));
        }
        let transport = SlackApiTransport::with_settings(
            options.token.clone(),
            Some(options.api_url.as_str()),
            options.insecure_skip_verify,
        )
        .change_context(Error::Config("Invalid Slack transport settings".to_string()))?;
        Ok(Self::with_transport(options, Arc::new(transport), new_state()))
    }

    pub fn with_transport(
        options: SlackOptions,
        transport: Arc<dyn SlackTransport>,
        state: Arc<ThreadState>,
    ) -> Self {
        Self {
            options,
            client: ThreadedClient::new(transport, state),
        }
    }

    pub fn options(&self) -> &SlackOptions {
        &self.options
    }

    pub fn state(&self) -> &Arc<ThreadState> {
        self.client.state()
    }

    pub async fn send(
        &self,
        cancel: &CancellationToken,
        notification: &Notification,
        destination: &Destination,
    ) -> ServiceResult<()> {
        let (msg_options, slack) = build_message_options(notification, &self.options)?;

        self.client
            .send_message(
                cancel,
                &destination.recipient,
                &slack.grouping_key,
                slack.notify_broadcast,
                slack.delivery_policy,
                msg_options,
            )
            .await
            .change_context_lazy(|| Error::Delivery(destination.recipient.clone()))?;

        tracing::info!(
            recipient = %destination.recipient,
            grouping_key = %slack.grouping_key,
            policy = %slack.delivery_policy,
            "Slack notification delivered"
        );
        Ok(())
    }
}
