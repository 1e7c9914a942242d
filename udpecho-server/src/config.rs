//! Server configuration: CLI flags over `UDPECHO_SERVER_*` env vars over
//! `server.toml` over built-in defaults.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

/// Default bind IP address.
pub const DEFAULT_IP: &str = "127.0.0.1";
/// Default listening port. On some operating systems, privileged port
/// numbers need elevated rights.
pub const DEFAULT_PORT: u16 = 1024;

/// A simple UDP echo server.
#[derive(Parser, Debug, Default)]
#[command(name = "udpecho-server", version, about)]
pub struct Args {
    /// IP address of the host.
    #[arg(long)]
    pub ip: Option<String>,

    /// Port number to listen on.
    #[arg(long)]
    pub port: Option<u16>,
}

/// Optional overrides read from server.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub ip: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved server settings.
#[derive(Debug)]
pub struct Settings {
    pub bind: SocketAddr,
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
}

/// Resolve settings from flags, env, file, and defaults, in that order of
/// precedence.
pub fn resolve(args: &Args) -> Result<Settings, ConfigError> {
    resolve_with_file(args, load_file().unwrap_or_default())
}

fn resolve_with_file(args: &Args, file: FileConfig) -> Result<Settings, ConfigError> {
    let mut defaulted = Vec::new();

    let ip_value = args
        .ip
        .clone()
        .or_else(|| std::env::var("UDPECHO_SERVER_IP").ok())
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
        .or(parse_env::<u16>("UDPECHO_SERVER_PORT")?)
        .or(file.port)
        .unwrap_or_else(|| {
            defaulted.push("port");
            DEFAULT_PORT
        });

    Ok(Settings {
        bind: SocketAddr::new(ip, port),
        defaulted,
    })
}

/// Read an env var and parse it. A present but unparseable value is a fatal
/// configuration error, not a silent fallback.
fn parse_env<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
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
        out.push(home.join(".config/udpecho/server.toml"));
    }
    out.push(PathBuf::from("/etc/udpecho/server.toml"));
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_unspecified_uses_defaults_and_reports_them() {
        let settings = resolve_with_file(&Args::default(), FileConfig::default()).unwrap();
        assert_eq!(settings.bind, "127.0.0.1:1024".parse().unwrap());
        assert_eq!(settings.defaulted, vec!["ip", "port"]);
    }

    #[test]
    fn flags_override_file() {
        let args = Args {
            ip: Some("0.0.0.0".into()),
            port: Some(9000),
        };
        let file = FileConfig {
            ip: Some("192.168.0.1".into()),
            port: Some(2048),
        };
        let settings = resolve_with_file(&args, file).unwrap();
        assert_eq!(settings.bind, "0.0.0.0:9000".parse().unwrap());
        assert!(settings.defaulted.is_empty());
    }

    #[test]
    fn malformed_ip_is_fatal() {
        let args = Args {
            ip: Some("999.999.999.999".into()),
            port: None,
        };
        assert!(matches!(
            resolve_with_file(&args, FileConfig::default()),
            Err(ConfigError::InvalidIp { .. })
        ));
    }
}
