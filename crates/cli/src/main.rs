use std::time::Duration;

use {
    anyhow::Context as _,
    clap::Parser,
    murmur_config::{ConfigSource, MurmurConfig},
    murmur_relay::Relay,
    murmur_slack::{SlackConfig, SlackSource},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

/// Pause between a lost connection and the next attempt.
const RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Parser)]
#[command(
    name = "murmur",
    version,
    about = "Read Slack messages aloud through a text-to-speech command"
)]
struct Cli {
    /// Slack bot token (xoxb-...).
    #[arg(short, long, env = "MURMUR_SLACK_TOKEN", hide_env_values = true)]
    token: String,

    /// Slack app-level token for Socket Mode (xapp-...).
    #[arg(short, long, env = "MURMUR_SLACK_APP_TOKEN", hide_env_values = true)]
    app_token: String,

    /// Config as inline JSON, `@path` to read a file or `@-` for stdin.
    #[arg(short, long, default_value = "")]
    data: ConfigSource,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = murmur_config::load(&cli.data).context("failed to load config")?;
    info!("config:\n{config}");

    let slack = SlackConfig::new(cli.token, cli.app_token);
    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    info!("murmur started, press Ctrl-C to exit");
    run(&config, &slack, &cancel).await?;
    info!("murmur stopped");
    Ok(())
}

/// Connect, relay until the connection drops, wait, repeat.
///
/// Only configuration errors end the loop with an error.
async fn run(
    config: &MurmurConfig,
    slack: &SlackConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    loop {
        let relay = Relay::from_config(config).context("invalid configuration")?;

        let connected = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            connected = SlackSource::connect(slack, cancel) => connected,
        };
        match connected {
            Ok(source) => match relay.start(source, cancel.child_token()).join().await {
                Ok(report) => info!(stats = ?report.dispatch, "relay stopped"),
                Err(e) => warn!(error = %e, "relay stopped"),
            },
            Err(e) => warn!(error = %e, "failed to connect to slack"),
        }

        if cancel.is_cancelled() {
            return Ok(());
        }
        info!(delay = ?RECONNECT_DELAY, "reconnecting");
        tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            () = tokio::time::sleep(RECONNECT_DELAY) => {},
        }
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupted, shutting down"),
        Err(e) => warn!(error = %e, "failed to listen for Ctrl-C, shutting down"),
    }
    cancel.cancel();
}
