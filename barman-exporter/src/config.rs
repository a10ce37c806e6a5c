//! Command-line and environment configuration.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::api::ApiServerConfig;
use crate::api::server::{DEFAULT_LISTEN, DEFAULT_METRICS_PATH};
use crate::error::{Error, Result};

/// Default barman binary, looked up on `PATH`.
pub const DEFAULT_BARMAN_PATH: &str = "barman";

fn version_string() -> String {
    format!(
        "version: {}, commit: {}, built at: {}",
        env!("CARGO_PKG_VERSION"),
        option_env!("BUILD_COMMIT").unwrap_or("unknown"),
        option_env!("BUILD_TIME").unwrap_or("unknown"),
    )
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Command-line arguments. Every flag can also be set from the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "barman-exporter", about = "barman-exporter", version = version_string())]
pub struct Args {
    /// listen address
    #[arg(short, long, env = "LISTEN", default_value = DEFAULT_LISTEN)]
    pub listen: String,

    /// interval
    #[arg(
        short,
        long,
        env = "INTERVAL",
        default_value = "5m",
        value_parser = humantime::parse_duration
    )]
    pub interval: Duration,

    /// metrics path
    #[arg(short, long, env = "METRICS_PATH", default_value = DEFAULT_METRICS_PATH)]
    pub metrics_path: String,

    /// barman path
    #[arg(short = 'p', long, env = "BARMAN_PATH", default_value = DEFAULT_BARMAN_PATH)]
    pub barman_path: PathBuf,

    /// log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Validated exporter configuration.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub server: ApiServerConfig,
    pub interval: Duration,
    pub barman_path: PathBuf,
    pub log_format: LogFormat,
}

impl ExporterConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        if args.interval.is_zero() {
            return Err(Error::config("interval must be greater than zero"));
        }

        if !args.metrics_path.starts_with('/') {
            return Err(Error::config(format!(
                "metrics path {:?} must start with '/'",
                args.metrics_path
            )));
        }
        if args.metrics_path == "/health" || args.metrics_path.starts_with("/health/") {
            return Err(Error::config("metrics path cannot be under /health"));
        }

        Ok(Self {
            server: ApiServerConfig {
                listen: parse_listen_addr(&args.listen)?,
                metrics_path: args.metrics_path,
            },
            interval: args.interval,
            barman_path: args.barman_path,
            log_format: args.log_format,
        })
    }
}

/// Resolve a listen address. A bare `:port` binds every interface.
pub fn parse_listen_addr(listen: &str) -> Result<SocketAddr> {
    let listen = listen.trim();
    let candidate = if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    };

    if let Ok(addr) = candidate.parse::<SocketAddr>() {
        return Ok(addr);
    }

    candidate
        .to_socket_addrs()
        .map_err(|e| Error::config(format!("invalid listen address {:?}: {}", listen, e)))?
        .next()
        .ok_or_else(|| Error::config(format!("listen address {:?} resolved to nothing", listen)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("barman-exporter").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = ExporterConfig::from_args(parse(&[])).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.server.metrics_path, "/metrics");
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.barman_path, PathBuf::from("barman"));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_flags() {
        let args = parse(&[
            "-l",
            "127.0.0.1:9100",
            "-i",
            "30s",
            "-m",
            "/probe",
            "-p",
            "/usr/local/bin/barman",
            "--log-format",
            "json",
        ]);
        let config = ExporterConfig::from_args(args).unwrap();

        assert_eq!(config.server.listen, "127.0.0.1:9100".parse().unwrap());
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.server.metrics_path, "/probe");
        assert_eq!(config.barman_path, PathBuf::from("/usr/local/bin/barman"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_long_flags() {
        let args = parse(&["--interval", "1h 30m", "--barman-path", "barman-cli"]);
        assert_eq!(args.interval, Duration::from_secs(5400));
        assert_eq!(args.barman_path, PathBuf::from("barman-cli"));
    }

    #[rstest]
    #[case::zero_interval(&["-i", "0s"])]
    #[case::relative_path(&["-m", "metrics"])]
    #[case::health_path(&["-m", "/health"])]
    #[case::bad_listen(&["-l", "not an address"])]
    fn test_invalid(#[case] argv: &[&str]) {
        assert!(matches!(
            ExporterConfig::from_args(parse(argv)),
            Err(Error::Configuration(_))
        ));
    }

    #[rstest]
    #[case(":8000", "0.0.0.0:8000")]
    #[case("127.0.0.1:9000", "127.0.0.1:9000")]
    #[case("[::1]:8000", "[::1]:8000")]
    fn test_parse_listen_addr(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse_listen_addr(input).unwrap(), expected.parse().unwrap());
    }

    #[test]
    fn test_version_string() {
        assert!(version_string().starts_with(concat!("version: ", env!("CARGO_PKG_VERSION"))));
    }
}
