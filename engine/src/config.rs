use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use cpu_burn::limits::{MAX_CONCURRENCY, MAX_DURATION_SECS};
use cpu_burn::LoadLimits;

/// HTTP front end for the CPU load generator.
#[derive(Debug, Clone, Parser)]
#[command(name = "cpu-burn-engine", version)]
pub struct Config {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Longest run a caller can ask for, in seconds
    #[arg(long, env = "CPU_BURN_MAX_DURATION", default_value_t = MAX_DURATION_SECS)]
    pub max_duration: u64,

    /// Most worker threads a single run may use
    #[arg(long, env = "CPU_BURN_MAX_CONCURRENCY", default_value_t = MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Emit JSON log lines instead of plain text
    #[arg(long, env = "CPU_BURN_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn limits(&self) -> LoadLimits {
        LoadLimits::new(self.max_duration, self.max_concurrency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::try_parse_from(["cpu-burn-engine"]).unwrap();
        assert_eq!(cfg.max_duration, 300);
        assert_eq!(cfg.max_concurrency, 16);
        assert!(!cfg.log_json);
    }

    #[test]
    fn test_overrides_shape_limits() {
        let cfg = Config::try_parse_from([
            "cpu-burn-engine",
            "--host",
            "127.0.0.1",
            "--port",
            "3000",
            "--max-duration",
            "120",
            "--max-concurrency",
            "8",
        ])
        .unwrap();

        assert_eq!(cfg.socket_addr().unwrap(), "127.0.0.1:3000".parse().unwrap());
        let limits = cfg.limits();
        assert_eq!(limits.max_duration_secs(), 120);
        assert_eq!(limits.max_concurrency(), 8);
    }

    #[test]
    fn test_bad_host_is_an_error() {
        let cfg = Config::try_parse_from(["cpu-burn-engine", "--host", "not a host"]).unwrap();
        assert!(cfg.socket_addr().is_err());
    }
}
