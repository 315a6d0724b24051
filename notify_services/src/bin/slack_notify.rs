use std::{process, str::FromStr};

use clap::Parser;
use notify_core::log::init_tracing;
use notify_core::slack::DeliveryPolicy;
use notify_services::notification::{Destination, Notification};
use notify_services::services::slack::{SlackNotification, SlackOptions, SlackService};
use tokio_util::sync::CancellationToken;

/// Send one Slack notification to one or more recipients
#[derive(Parser, Debug)]
#[command(name = "slack_notify")]
struct Cli {
    /// Recipient channel; repeatable. Defaults to SLACK_CHANNELS
    #[arg(long = "to", value_name = "RECIPIENT")]
    recipients: Vec<String>,

    /// Grouping key threading related notifications
    #[arg(long = "group", value_name = "GROUPING_KEY", default_value = "")]
    grouping_key: String,

    /// Delivery policy once a thread exists; unknown values mean Post
    #[arg(long, default_value_t, value_parser = DeliveryPolicy::from_str)]
    policy: DeliveryPolicy,

    /// Also show threaded replies in the channel
    #[arg(long)]
    broadcast: bool,

    /// Attachments as a JSON array
    #[arg(long, value_name = "JSON", default_value = "")]
    attachments: String,

    /// Blocks as a JSON array
    #[arg(long, value_name = "JSON", default_value = "")]
    blocks: String,

    /// Message text
    #[arg(required = true, num_args = 1..)]
    message: Vec<String>,
}

impl Cli {
    fn slack(&self) -> SlackNotification {
        SlackNotification {
            attachments: self.attachments.clone(),
            blocks: self.blocks.clone(),
            grouping_key: self.grouping_key.clone(),
            notify_broadcast: self.broadcast,
            delivery_policy: self.policy,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("slack_notify error: {err}");
        process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    dotenv::dotenv().ok();
    let prod_format = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");
    init_tracing(prod_format);

    let args = Cli::parse();
    let options = SlackOptions::from_env().map_err(|e| format!("{e:?}"))?;

    let recipients = if args.recipients.is_empty() {
        options.channels.clone()
    } else {
        args.recipients.clone()
    };
    if recipients.is_empty() {
        return Err("no --to recipient given and SLACK_CHANNELS is empty".to_string());
    }

    let service = SlackService::new(options).map_err(|e| format!("{e:?}"))?;
    let notification = Notification::new(args.message.join(" ")).with_slack(args.slack());

    // Ctrl-C aborts sends waiting on the rate limiter
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let mut failed = 0;
    for recipient in recipients {
        let destination = Destination::new("slack", recipient);
        match service.send(&cancel, &notification, &destination).await {
            Ok(()) => println!("Sent to {}", destination.recipient),
            Err(e) => {
                tracing::error!("Failed to notify {}: {e:?}", destination.recipient);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} recipient(s) failed"));
    }
    Ok(())
}
