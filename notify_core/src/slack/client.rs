//! Threaded delivery of Slack messages.
//!
//! A grouping key ties several notifications to one Slack thread. The first
//! message posted for a (recipient, grouping key) pair becomes the thread
//! parent; the [`DeliveryPolicy`] decides whether later notifications reply in
//! that thread, edit the parent, or both.

use std::sync::Arc;

use error_stack::ResultExt;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, ModelResult},
    network::AdaptiveRateLimiter,
};

use super::{
    constants::DEFAULT_RETRY_AFTER,
    options::MessageOption,
    policy::DeliveryPolicy,
    state::ThreadState,
    transport::{PostedMessage, SlackTransport},
};

/// Delivery engine bound to one transport and one shared [`ThreadState`].
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct ThreadedClient {
    transport: Arc<dyn SlackTransport>,
    state: Arc<ThreadState>,
}

impl std::fmt::Debug for ThreadedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadedClient")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ThreadedClient {
    pub fn new(transport: Arc<dyn SlackTransport>, state: Arc<ThreadState>) -> Self {
        Self { transport, state }
    }

    pub fn state(&self) -> &Arc<ThreadState> {
        &self.state
    }

    /// Delivers one notification to `recipient`.
    ///
    /// | policy        | no thread yet      | thread exists              |
    /// |---------------|--------------------|----------------------------|
    /// | Post          | post, remember ts  | post in thread             |
    /// | PostAndUpdate | post, remember ts  | post in thread, update     |
    /// | Update        | post, remember ts  | update only                |
    ///
    /// An empty `grouping_key` never threads.
    ///
    /// # Arguments
    ///
    /// * `cancel` - Aborts the send while it waits on the rate limiter
    /// * `recipient` - Channel name or ID as configured by the caller
    /// * `grouping_key` - Key tying notifications to one thread
    /// * `broadcast` - Also show the threaded reply in the channel
    /// * `policy` - Post, update or both once a thread exists
    /// * `options` - Rendered message options, forwarded untouched
    ///
    /// # Errors
    ///
    /// Returns the first error of the post or update call, including
    /// [`Error::Cancelled`]. Nothing is recorded for the failed call, but a
    /// post that succeeded before a failed update keeps its channel ID.
    pub async fn send_message(
        &self,
        cancel: &CancellationToken,
        recipient: &str,
        grouping_key: &str,
        broadcast: bool,
        policy: DeliveryPolicy,
        mut options: Vec<MessageOption>,
    ) -> ModelResult<()> {
        let thread_ts = if grouping_key.is_empty() {
            None
        } else {
            self.state.thread_ts(recipient, grouping_key)
        };

        if let Some(ts) = &thread_ts {
            options.push(MessageOption::ThreadTs(ts.clone()));
        }

        if thread_ts.is_none() || policy.posts_when_threaded() {
            let mut post_options = options.clone();
            post_options.push(MessageOption::Post);
            if broadcast {
                post_options.push(MessageOption::Broadcast);
            }

            tracing::debug!(
                %recipient,
                %grouping_key,
                %policy,
                threaded = thread_ts.is_some(),
                "Posting Slack message"
            );
            let posted = send_rate_limited(
                self.transport.as_ref(),
                self.state.limiter(),
                cancel,
                recipient,
                &post_options,
            )
            .await?;

            self.state.set_channel_id(recipient, &posted.channel);
            if thread_ts.is_none() && !grouping_key.is_empty() {
                self.state
                    .set_thread_ts(recipient, grouping_key, &posted.ts);
            }
        }

        if let Some(ts) = thread_ts.filter(|_| policy.updates_when_threaded()) {
            let channel = self
                .state
                .channel_id(recipient)
                .unwrap_or_else(|| recipient.to_string());
            options.push(MessageOption::Update { ts: ts.clone() });

            tracing::debug!(
                %recipient,
                %channel,
                %grouping_key,
                %ts,
                "Updating Slack thread parent"
            );
            send_rate_limited(
                self.transport.as_ref(),
                self.state.limiter(),
                cancel,
                &channel,
                &options,
            )
            .await?;
        }

        Ok(())
    }
}

/// Calls the transport until it stops reporting rate limiting.
///
/// A rate-limited answer tightens the limiter to one call per retry-after
/// period and tries again; success opens the limiter back up. There is no
/// attempt cap: cancellation is the only bound on total time.
///
/// # Arguments
///
/// * `transport` - Backend performing the actual call
/// * `limiter` - Limiter awaited before every attempt
/// * `cancel` - Aborts the wait on the limiter
/// * `channel` - Destination passed to the transport
/// * `options` - Message options passed to the transport
///
/// # Returns
///
/// The channel ID and timestamp of the first successful call.
///
/// # Errors
///
/// - [`Error::Cancelled`] when `cancel` fires before or during a wait
/// - Any transport error other than [`Error::RatelimitExceeded`], unchanged
pub async fn send_rate_limited(
    transport: &dyn SlackTransport,
    limiter: &AdaptiveRateLimiter,
    cancel: &CancellationToken,
    channel: &str,
    options: &[MessageOption],
) -> ModelResult<PostedMessage> {
    loop {
        limiter
            .until_ready(cancel)
            .await
            .attach_printable_lazy(|| format!("Sending to {channel}"))?;

        match transport.send_message(channel, options).await {
            Ok(posted) => {
                limiter.set_unlimited();
                return Ok(posted);
            }
            Err(e) => match e.current_context() {
                Error::RatelimitExceeded(retry_after) => {
                    let retry_after = retry_after.unwrap_or(DEFAULT_RETRY_AFTER);
                    tracing::warn!(
                        %channel,
                        "Slack rate limit exceeded. Retry after {:?}",
                        retry_after
                    );
                    limiter.set_period(retry_after);
                }
                _ => return Err(e),
            },
        }
    }
}
