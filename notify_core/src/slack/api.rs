//! `SlackTransport` over the Slack Web API.

use async_trait::async_trait;
use error_stack::{ResultExt, report};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{Map, Value, json};

use crate::{
    error::{Error, ModelResult},
    network::http::handle_reqwest_response,
};

use super::{
    constants::{POST_MESSAGE_PATH, RATELIMITED_ERROR, SLACK_API_URL, UPDATE_MESSAGE_PATH},
    options::MessageOption,
    responses::SlackResponse,
    transport::{PostedMessage, SlackTransport},
};

pub static HTTP_CLIENT: Lazy<Client> = Lazy::new(Client::new);

/// Sends messages with a bot token through `chat.postMessage` and
/// `chat.update`.
#[derive(Debug, Clone)]
pub struct SlackApiTransport {
    client: Client,
    token: String,
    api_url: String,
}

impl SlackApiTransport {
    /// Uses the shared HTTP client and the public Slack API URL.
    pub fn new(token: String) -> Self {
        Self {
            client: HTTP_CLIENT.clone(),
            token,
            api_url: SLACK_API_URL.to_string(),
        }
    }

    /// Builds a transport with a custom base URL and TLS behaviour.
    ///
    /// # Arguments
    ///
    /// * `token` - The Slack bot token sent as bearer auth
    /// * `api_url` - Optional base URL override (Enterprise Grid proxies, test
    ///   servers). Blank values fall back to the public Slack API
    /// * `insecure_skip_verify` - Build a dedicated client that accepts invalid
    ///   certificates instead of using the shared one
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReqwestError`] if the dedicated HTTP client cannot be
    /// built.
    pub fn with_settings(
        token: String,
        api_url: Option<&str>,
        insecure_skip_verify: bool,
    ) -> ModelResult<Self> {
        let client = if insecure_skip_verify {
            Client::builder()
                .danger_accept_invalid_certs(true)
                .build()
                .change_context(Error::ReqwestError(
                    "Failed to build HTTP client".to_string(),
                ))?
        } else {
            HTTP_CLIENT.clone()
        };
        let api_url = match api_url {
            Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => SLACK_API_URL.to_string(),
        };
        Ok(Self {
            client,
            token,
            api_url,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl SlackTransport for SlackApiTransport {
    async fn send_message(
        &self,
        channel: &str,
        options: &[MessageOption],
    ) -> ModelResult<PostedMessage> {
        let (uri_path, body) = build_request(channel, options);
        let url = format!("{}{uri_path}", self.api_url);
        tracing::debug!(%channel, %uri_path, "Calling Slack API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .change_context(Error::ReqwestError("Failed to send request".to_string()))
            .attach_printable_lazy(|| format!("POST {uri_path}"))?;

        let response: SlackResponse = handle_reqwest_response(response)
            .await
            .attach_printable_lazy(|| format!("POST {uri_path} to channel {channel}"))?;
        handle_slack_response(response)
    }
}

/// Picks the API method and renders the JSON body for a list of options.
///
/// Options are applied in order. `Update` switches to `chat.update`, which
/// takes the target `ts` and ignores thread placement, so `thread_ts` and
/// `reply_broadcast` are dropped from update bodies.
pub fn build_request(channel: &str, options: &[MessageOption]) -> (&'static str, Value) {
    let mut body = Map::new();
    body.insert("channel".to_string(), json!(channel));
    let mut uri_path = POST_MESSAGE_PATH;

    for option in options {
        match option {
            MessageOption::Text(text) => {
                body.insert("text".to_string(), json!(text));
            }
            MessageOption::Username(username) => {
                body.insert("username".to_string(), json!(username));
            }
            MessageOption::IconEmoji(emoji) => {
                body.insert("icon_emoji".to_string(), json!(emoji));
            }
            MessageOption::IconUrl(url) => {
                body.insert("icon_url".to_string(), json!(url));
            }
            MessageOption::Attachments(attachments) => {
                body.insert("attachments".to_string(), Value::Array(attachments.clone()));
            }
            MessageOption::Blocks(blocks) => {
                body.insert("blocks".to_string(), Value::Array(blocks.clone()));
            }
            MessageOption::DisableLinkUnfurl => {
                body.insert("unfurl_links".to_string(), json!(false));
                body.insert("unfurl_media".to_string(), json!(false));
            }
            MessageOption::ThreadTs(ts) => {
                body.insert("thread_ts".to_string(), json!(ts));
            }
            MessageOption::Broadcast => {
                body.insert("reply_broadcast".to_string(), json!(true));
            }
            MessageOption::Post => {
                uri_path = POST_MESSAGE_PATH;
                body.remove("ts");
            }
            MessageOption::Update { ts } => {
                uri_path = UPDATE_MESSAGE_PATH;
                body.insert("ts".to_string(), json!(ts));
            }
        }
    }

    if uri_path == UPDATE_MESSAGE_PATH {
        body.remove("thread_ts");
        body.remove("reply_broadcast");
    }

    (uri_path, Value::Object(body))
}

/// Maps a decoded Slack body to a result.
///
/// `ok:false` with the `ratelimited` code becomes
/// [`Error::RatelimitExceeded`] without a hint (the header, when present, is
/// handled at HTTP level).
fn handle_slack_response(response: SlackResponse) -> ModelResult<PostedMessage> {
    match response {
        SlackResponse::Message(message) if message.ok => Ok(PostedMessage {
            channel: message.channel,
            ts: message.ts,
        }),
        SlackResponse::Message(message) => Err(report!(Error::SlackApi(
            "response not ok".to_string()
        ))
        .attach_printable(format!("{message:?}"))),
        SlackResponse::Error(slack_error) if slack_error.error == RATELIMITED_ERROR => {
            tracing::warn!("Slack API answered ratelimited");
            Err(report!(Error::RatelimitExceeded(None)))
        }
        SlackResponse::Error(slack_error) => {
            tracing::error!("Error in slack api response: {}", slack_error.error);
            Err(report!(Error::SlackApi(slack_error.error)))
        }
        SlackResponse::UnknownResponse(value) => {
            tracing::error!("Unknown response: {value:?}");
            Err(report!(Error::Unknown)
                .attach_printable(format!("Unknown response from Slack API: {value:?}")))
        }
    }
}
