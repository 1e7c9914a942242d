//! UDP echo client: send one message, wait for the echo, retry with backoff.

mod config;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use udpecho_core::{wire, Exchanger, Outcome};

// Exit status: 0 delivered, 1 retries exhausted, 2 could not start,
// 130 interrupted.
const EXIT_EXHAUSTED: u8 = 1;
const EXIT_FATAL: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let args = config::Args::parse();
    init_tracing();

    let settings = match config::resolve(&args) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_FATAL);
        }
    };
    if !settings.defaulted.is_empty() {
        tracing::info!(
            fields = ?settings.defaulted,
            "unspecified settings use built-in defaults"
        );
    }

    let (payload, truncated) = wire::clamp_payload(args.message.as_bytes());
    if truncated {
        tracing::warn!(limit = wire::MAX_PAYLOAD, "message truncated to the payload limit");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "cannot start runtime");
            return ExitCode::from(EXIT_FATAL);
        }
    };
    rt.block_on(run(settings, payload))
}

async fn run(settings: config::Settings, payload: &[u8]) -> ExitCode {
    let exchanger =
        match Exchanger::connect(settings.peer, settings.schedule, settings.max_retries).await {
            Ok(exchanger) => exchanger,
            Err(e) => {
                tracing::error!(peer = %settings.peer, error = %e, "cannot start exchange");
                return ExitCode::from(EXIT_FATAL);
            }
        };
    tracing::info!(peer = %settings.peer, max_retries = settings.max_retries, "exchanging");

    tokio::select! {
        outcome = exchanger.exchange(payload) => match outcome {
            Ok(Outcome::Delivered { reply, attempts }) => {
                tracing::info!(attempts, "echo received: {}", String::from_utf8_lossy(&reply));
                ExitCode::SUCCESS
            }
            Ok(Outcome::Exhausted { attempts }) => {
                tracing::error!(attempts, "no reply, retries exhausted");
                ExitCode::from(EXIT_EXHAUSTED)
            }
            Err(e) => {
                tracing::error!(error = %e, "exchange failed");
                ExitCode::from(EXIT_FATAL)
            }
        },
        sig = tokio::signal::ctrl_c() => match sig {
            Ok(()) => {
                tracing::warn!("interrupted, abandoning exchange");
                ExitCode::from(EXIT_INTERRUPTED)
            }
            Err(e) => {
                tracing::error!(error = %e, "signal handler failed");
                ExitCode::from(EXIT_FATAL)
            }
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
