use anyhow::{Context, bail};
use clap::Parser;
use core::time::Duration;
use std::net::SocketAddr;

/// Runtime configuration for the `delayhash-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first), with defaults suitable for local use.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "delayhash-server",
    version,
    about = "An HTTP service that hashes passwords after a delay"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Port to listen on, overriding the port part of `--server-addr`.
    ///
    /// Environment variable: `PORT`
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// How long each submission waits before its digest is computed and
    /// published.
    ///
    /// Accepts `500ms`, `5s`, `1m`, `1h` or a bare number of seconds.
    ///
    /// Environment variable: `HASH_DELAY`
    #[arg(long, env = "HASH_DELAY", default_value = "5s", value_parser = parse_duration)]
    pub hash_delay: Duration,

    /// Upper bound on how long shutdown waits for in-flight work before
    /// exiting anyway.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value = "1m", value_parser = parse_duration)]
    pub shutdown_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: SocketAddr,
    pub hash_delay: Duration,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let mut server_addr: SocketAddr = args.server_addr.parse().with_context(|| {
            format!("SERVER_ADDR `{}` is not a socket address", args.server_addr)
        })?;
        if let Some(port) = args.port {
            server_addr.set_port(port);
        }

        if args.shutdown_timeout.is_zero() {
            bail!("SHUTDOWN_TIMEOUT must be greater than 0");
        }

        Ok(Self {
            server_addr,
            hash_delay: args.hash_delay,
            shutdown_timeout: args.shutdown_timeout,
        })
    }
}

pub(crate) fn parse_duration(raw: &str) -> Result<Duration, String> {
    let s = raw.trim().to_lowercase();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration `{raw}`"))?;

    match unit.trim() {
        "ms" => Ok(Duration::from_millis(value)),
        "" | "s" | "sec" | "secs" => Ok(Duration::from_secs(value)),
        "m" | "min" | "mins" => Ok(Duration::from_secs(value.saturating_mul(60))),
        "h" | "hr" | "hrs" => Ok(Duration::from_secs(value.saturating_mul(3600))),
        other => Err(format!("unknown duration unit `{other}` in `{raw}`")),
    }
}
