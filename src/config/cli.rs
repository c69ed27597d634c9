use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "gpm-bridge")]
#[command(about = "Read-only JSON facade over the GPM+ API for Power BI")]
pub struct CliConfig {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn bind_addr(&self) -> String {
        // IPv6 literals need brackets in a socket address.
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    #[test]
    fn test_defaults() {
        let config = CliConfig::parse_from(["gpm-bridge", "--port", "8000"]);
        assert_eq!(config.port, 8000);
        assert!(config.bind_addr().ends_with(":8000"));
        assert!(!config.verbose);
    }

    #[test]
    fn test_bind_addr() {
        let config = CliConfig::parse_from(["gpm-bridge", "--host", "127.0.0.1", "--port", "9001"]);
        assert_eq!(config.bind_addr(), "127.0.0.1:9001");
        assert!(config.bind_addr().parse::<SocketAddr>().is_ok());

        let config = CliConfig::parse_from(["gpm-bridge", "--host", "::1", "--port", "9001"]);
        assert_eq!(config.bind_addr(), "[::1]:9001");
        assert!(config.bind_addr().parse::<SocketAddr>().is_ok());
    }

    #[test]
    fn test_json_log_format() {
        let config = CliConfig::parse_from(["gpm-bridge", "--log-format", "json", "--verbose"]);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.verbose);
    }
}
