//! Command line and environment configuration

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::session::SessionStoreConfig;
use crate::tfc::DEFAULT_TFC_ADDRESS;

/// Which MCP transport to serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// Streamable HTTP at /mcp
    Http,
    /// stdin/stdout, single session
    Stdio,
}

/// CLI arguments. Every flag falls back to an environment variable.
///
/// Not `Debug`: the default token must not end up in logs.
#[derive(Parser)]
#[command(name = "tfc-mcp")]
#[command(about = "Terraform Cloud MCP server with per-session API tokens")]
#[command(version)]
pub struct Args {
    /// MCP transport
    #[arg(long, value_enum, default_value = "http", env = "TFC_MCP_TRANSPORT")]
    pub transport: TransportKind,

    /// Host name or IP address to bind the HTTP server to
    #[arg(long, default_value = "127.0.0.1", env = "TFC_MCP_HOST")]
    pub host: String,

    /// Port for the HTTP server
    #[arg(short, long, default_value = "8000", env = "TFC_MCP_PORT")]
    pub port: u16,

    /// Terraform Cloud / Enterprise address
    #[arg(long, default_value = DEFAULT_TFC_ADDRESS, env = "TFC_ADDRESS")]
    pub tfc_address: String,

    /// Token used when a session has not called set_token
    #[arg(long, env = "TFC_TOKEN", hide_env_values = true)]
    pub tfc_token: Option<String>,

    /// Idle seconds before a session's credentials expire (0 disables)
    #[arg(long, default_value = "1800", env = "SESSION_TTL_SECONDS")]
    pub session_ttl: u64,

    /// Maximum number of sessions held at once
    #[arg(long, default_value = "10000", env = "SESSION_MAX_ENTRIES")]
    pub session_max_entries: usize,

    /// Seconds between sweeps for expired sessions
    #[arg(long, default_value = "60", env = "SESSION_SWEEP_SECONDS")]
    pub session_sweep: u64,
}

/// Validated server configuration
pub struct ServerConfig {
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    pub tfc_address: String,
    pub default_token: Option<String>,
    pub store: SessionStoreConfig,
    pub sweep_interval: Duration,
}

impl Args {
    pub fn into_config(self) -> anyhow::Result<ServerConfig> {
        let host = self.host.trim().to_string();
        if host.is_empty() {
            anyhow::bail!("TFC_MCP_HOST cannot be empty");
        }

        if self.session_max_entries == 0 {
            anyhow::bail!("SESSION_MAX_ENTRIES must be at least 1");
        }

        let default_token = self
            .tfc_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(ServerConfig {
            transport: self.transport,
            host,
            port: self.port,
            tfc_address: self.tfc_address,
            default_token,
            store: SessionStoreConfig {
                idle_ttl: Duration::from_secs(self.session_ttl),
                max_entries: self.session_max_entries,
            },
            sweep_interval: Duration::from_secs(self.session_sweep.max(1)),
        })
    }
}

impl ServerConfig {
    /// Resolve `host:port` to the first socket address. Host names are looked up.
    pub async fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| anyhow::anyhow!("Invalid bind address {}:{}: {}", self.host, self.port, e))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("No address found for {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["tfc-mcp"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap().into_config().unwrap()
    }

    #[test]
    fn test_explicit_flags() {
        let config = parse(&[
            "--transport",
            "stdio",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--tfc-address",
            "https://tfe.example.com",
            "--tfc-token",
            "  default-token ",
            "--session-ttl",
            "0",
            "--session-max-entries",
            "5",
            "--session-sweep",
            "0",
        ]);
        assert_eq!(config.transport, TransportKind::Stdio);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.tfc_address, "https://tfe.example.com");
        assert_eq!(config.default_token.as_deref(), Some("default-token"));
        assert!(config.store.idle_ttl.is_zero());
        assert_eq!(config.store.max_entries, 5);
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_blank_token_is_none() {
        let config = parse(&["--tfc-token", "   "]);
        assert!(config.default_token.is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        let args = Args::try_parse_from(["tfc-mcp", "--session-max-entries", "0"]).unwrap();
        assert!(args.into_config().is_err());

        let args = Args::try_parse_from(["tfc-mcp", "--host", "  "]).unwrap();
        assert!(args.into_config().is_err());

        assert!(Args::try_parse_from(["tfc-mcp", "--transport", "carrier-pigeon"]).is_err());
    }

    #[tokio::test]
    async fn test_bind_addr_accepts_ip_and_hostname() {
        let config = parse(&["--host", "127.0.0.1", "--port", "9000"]);
        assert_eq!(config.bind_addr().await.unwrap().to_string(), "127.0.0.1:9000");

        let config = parse(&["--host", "localhost", "--port", "9001"]);
        let addr = config.bind_addr().await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 9001);
    }
}
