use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::rate_limit::RateLimits;

// CLI argument structure, api settings may also come from the environment / .env
#[derive(Parser, Debug, Clone)]
#[command(name = "report-poller")]
#[command(about = "Requests reports, polls them until ready and appends the results to a file")]
pub struct Args {
    // Reports API base url, e.g. https://api.example.com/v1
    #[arg(long, env = "REPORTS_API_URL")]
    pub api_url: String,

    // Bearer token sent with every call
    #[arg(long, env = "REPORTS_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    // Max requests per second across all workers, 0 = unlimited
    #[arg(long, default_value_t = 20)]
    pub max_per_second: u32,

    // Max requests per minute across all workers, 0 = unlimited
    #[arg(long, default_value_t = 0)]
    pub max_per_minute: u32,

    // Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    // Log level (error, warn, info, debug, trace); RUST_LOG is used when unset
    #[arg(long)]
    pub log_level: Option<LevelFilter>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the create / poll / write pipeline until interrupted
    Run(RunOptions),

    /// Delete a batch of reports with sequential ids, then exit
    Purge {
        // First id to delete
        #[arg(long, default_value_t = 1)]
        start_id: u64,

        // Number of ids to delete
        #[arg(long, default_value_t = 100)]
        count: u64,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunOptions {
    // Seconds between two create requests
    #[arg(long, default_value_t = 60)]
    pub create_interval_secs: u64,

    // Minimum milliseconds between two polls of the same report
    #[arg(long, default_value_t = 100)]
    pub poll_interval_ms: u64,

    // File results are appended to
    #[arg(short, long, default_value = "results.csv")]
    pub output: PathBuf,

    // Serve /health and /metrics on this port
    #[arg(long)]
    pub metrics_port: Option<u16>,
}

impl Args {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.api_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.api_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.api_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        if self.api_token.trim().is_empty() {
            return Err(ConfigError::EmptyToken);
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroInterval("request timeout"));
        }
        if let Command::Run(opts) = &self.command {
            opts.validate()?;
        }
        Ok(())
    }

    pub fn rate_limits(&self) -> RateLimits {
        RateLimits {
            per_second: self.max_per_second,
            per_minute: self.max_per_minute,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl RunOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.create_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("create interval"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("poll interval"));
        }
        Ok(())
    }

    pub fn create_interval(&self) -> Duration {
        Duration::from_secs(self.create_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
