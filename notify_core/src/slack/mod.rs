//! Slack delivery: message options, delivery policy, thread bookkeeping and
//! the rate-limited threaded client driving a [`SlackTransport`].

pub mod api;
pub mod client;
pub mod constants;
pub mod options;
pub mod policy;
pub mod responses;
pub mod state;
pub mod transport;

pub use api::SlackApiTransport;
pub use client::{ThreadedClient, send_rate_limited};
pub use options::MessageOption;
pub use policy::DeliveryPolicy;
pub use state::ThreadState;
pub use transport::{PostedMessage, SlackTransport};
