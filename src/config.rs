//! Configuration and CLI argument handling

use std::time::Duration;

use clap::Parser;

use crate::tasks::Visibility;

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "study-timer")]
#[command(about = "Drift-free study session timers behind one shared tick")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Shared tick period in milliseconds
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Start with the host reported as hidden
    #[arg(long)]
    pub hidden: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn initial_visibility(&self) -> Visibility {
        Visibility::from_visible(!self.hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["study-timer"]).unwrap();
        assert_eq!(config.address(), "0.0.0.0:20554");
        assert_eq!(config.tick_period(), Duration::from_secs(1));
        assert_eq!(config.initial_visibility(), Visibility::Visible);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "study-timer", "--tick-ms", "250", "--hidden", "-v", "-p", "8080",
        ])
        .unwrap();
        assert_eq!(config.tick_period(), Duration::from_millis(250));
        assert_eq!(config.initial_visibility(), Visibility::Hidden);
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_zero_tick_rejected() {
        assert!(Config::try_parse_from(["study-timer", "--tick-ms", "0"]).is_err());
    }
}
