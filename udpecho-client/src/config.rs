//! Client configuration: CLI flags over `UDPECHO_*` env vars over
//! `client.toml` over built-in defaults. Fields that fall back to the
//! built-in defaults are reported to the operator, informationally.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use serde::Deserialize;
use udpecho_core::backoff::{self, BackoffSchedule, InvalidSchedule};

/// Default peer IP address.
pub const DEFAULT_IP: &str = "127.0.0.1";
/// Default peer port.
pub const DEFAULT_PORT: u16 = 1024;
/// Default maximum number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 0;

/// A simple UDP client: send one message and wait for the echo, retrying
/// with exponential backoff.
#[derive(Parser, Debug, Default)]
#[command(name = "udpecho-client", version, about)]
pub struct Args {
    /// IP address of the echo server.
    #[arg(long)]
    pub ip: Option<String>,

    /// Port number of the targeted service.
    #[arg(long)]
    pub port: Option<u16>,

    /// Maximum number of attempts to retry.
    #[arg(long = "max-retry")]
    pub max_retry: Option<u32>,

    /// Wait before the first retry, in milliseconds.
    #[arg(long)]
    pub backoff_base_ms: Option<u64>,

    /// Growth factor applied to the wait after each failed attempt.
    #[arg(long)]
    pub backoff_multiplier: Option<u32>,

    /// Upper bound on the wait, in milliseconds.
    #[arg(long)]
    pub backoff_cap_ms: Option<u64>,

    /// Message to send.
    pub message: String,
}

/// Optional overrides read from client.toml. Missing fields fall through to
/// the next source during resolution.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub max_retries: Option<u32>,
    pub backoff_base_ms: Option<u64>,
    pub backoff_multiplier: Option<u32>,
    pub backoff_cap_ms: Option<u64>,
}

/// Fully resolved client settings, ready for the exchanger.
#[derive(Debug)]
pub struct Settings {
    pub peer: SocketAddr,
    pub max_retries: u32,
    pub schedule: BackoffSchedule,
    /// Field names that fell back to built-in defaults (informational).
    pub defaulted: Vec<&'static str>,
}

/// Configuration errors. All fatal, reported before any network activity.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid IP address {value:?}: {source}")]
    InvalidIp {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error(transparent)]
    InvalidSchedule(#[from] InvalidSchedule),
}

/// Resolve settings from flags, env, file, and defaults, in that order of
/// precedence. Syntax errors anywhere are fatal.
pub fn resolve(args: &Args) -> Result<Settings, ConfigError> {
    resolve_with_file(args, load_file().unwrap_or_default())
}

fn resolve_with_file(args: &Args, file: FileConfig) -> Result<Settings, ConfigError> {
    let mut defaulted = Vec::new();

    let ip_value = args
        .ip
        .clone()
        .or_else(|| std::env::var("UDPECHO_IP").ok())
        .or(file.ip)
        .unwrap_or_else(|| {
            defaulted.push("ip");
            DEFAULT_IP.to_string()
        });
    let ip: IpAddr = ip_value.parse().map_err(|source| ConfigError::InvalidIp {
        value: ip_value.clone(),
        source,
    })?;

    let port = args
        .port
        .or(parse_env::<u16>("UDPECHO_PORT")?)
        .or(file.port)
        .unwrap_or_else(|| {
            defaulted.push("port");
            DEFAULT_PORT
        });

    let max_retries = args
        .max_retry
        .or(parse_env::<u32>("UDPECHO_MAX_RETRY")?)
        .or(file.max_retries)
        .unwrap_or_else(|| {
            defaulted.push("max_retries");
            DEFAULT_MAX_RETRIES
        });

    let base_ms = args
        .backoff_base_ms
        .or(parse_env::<u64>("UDPECHO_BACKOFF_BASE_MS")?)
        .or(file.backoff_base_ms)
        .unwrap_or_else(|| {
            defaulted.push("backoff_base_ms");
            backoff::DEFAULT_BASE_MS
        });

    let multiplier = args
        .backoff_multiplier
        .or(parse_env::<u32>("UDPECHO_BACKOFF_MULTIPLIER")?)
        .or(file.backoff_multiplier)
        .unwrap_or_else(|| {
            defaulted.push("backoff_multiplier");
            backoff::DEFAULT_MULTIPLIER
        });

    let cap_ms = args
        .backoff_cap_ms
        .or(parse_env::<u64>("UDPECHO_BACKOFF_CAP_MS")?)
        .or(file.backoff_cap_ms)
        .unwrap_or_else(|| {
            defaulted.push("backoff_cap_ms");
            backoff::DEFAULT_CAP_MS
        });

    Ok(Settings {
        peer: SocketAddr::new(ip, port),
        max_retries,
        schedule: BackoffSchedule::from_millis(base_ms, multiplier, cap_ms)?,
        defaulted,
    })
}

/// Read an env var and parse it. A present but unparseable value is a fatal
/// configuration error, not a silent fallback.
fn parse_env<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue { name, value: raw })
}

fn config_paths() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        out.push(home.join(".config/udpecho/client.toml"));
    }
    out.push(PathBuf::from("/etc/udpecho/client.toml"));
    out
}

fn load_file() -> Option<FileConfig> {
    for path in config_paths() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(raw) => match toml::from_str::<FileConfig>(&raw) {
                    Ok(file) => return Some(file),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file")
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file")
                }
            }
            break;
        }
    }
    None
}
