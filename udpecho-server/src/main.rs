//! UDP echo server: echo every received datagram back to its sender.

mod config;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use udpecho_core::Responder;

const EXIT_FATAL: u8 = 2;

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

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "cannot start runtime");
            return ExitCode::from(EXIT_FATAL);
        }
    };
    rt.block_on(run(settings))
}

async fn run(settings: config::Settings) -> ExitCode {
    let responder = match Responder::bind(settings.bind).await {
        Ok(responder) => responder,
        Err(e) => {
            tracing::error!(addr = %settings.bind, error = %e, "cannot bind");
            return ExitCode::from(EXIT_FATAL);
        }
    };
    match responder.local_addr() {
        Ok(addr) => tracing::info!(%addr, "listening"),
        Err(e) => tracing::warn!(error = %e, "local address unavailable"),
    }

    tokio::select! {
        res = responder.run() => {
            // run() loops forever; reaching here means the loop itself died.
            if let Err(e) = res {
                tracing::error!(error = %e, "responder stopped");
            }
            ExitCode::from(EXIT_FATAL)
        }
        sig = shutdown_signal() => match sig {
            Ok(()) => {
                tracing::info!("shutting down");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "signal handler failed");
                ExitCode::from(EXIT_FATAL)
            }
        }
    }
}

/// Wait for Ctrl+C or SIGTERM (Unix).
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = sigterm.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
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
