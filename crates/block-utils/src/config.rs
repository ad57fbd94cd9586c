use crate::gas_price::RewardPercentiles;
use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Error deserializing config file")]
    Toml(#[from] toml::de::Error),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub log_level: LevelFilter,
    pub chain_name: String,
    pub jrpc_url: Url,
    pub retry_strategy_max_wait_time: Duration,
    pub fee_history_window: u64,
    pub reward_percentiles: RewardPercentiles,
}

impl Config {
    /// Loads all configuration options from CLI arguments, the TOML
    /// configuration file, and environment variables. Returns the requested
    /// subcommand alongside.
    pub fn parse() -> (Self, Command) {
        let clap = Clap::parse();
        let config_file = ConfigFile::from_file(&clap.config_file)
            .context("Failed to read config file as valid TOML")
            .unwrap();

        Self::from_clap_and_config_file(clap, config_file)
    }

    #[cfg(test)]
    fn parse_from(args: &[&str]) -> (Self, Command) {
        let clap = Clap::parse_from(args);
        let config_file = ConfigFile::from_file(&clap.config_file).unwrap();

        Self::from_clap_and_config_file(clap, config_file)
    }

    fn from_clap_and_config_file(clap: Clap, config_file: ConfigFile) -> (Self, Command) {
        let [slow, medium, fast] = config_file.reward_percentiles;
        let config = Self {
            log_level: clap.log_level,
            chain_name: config_file.chain_name,
            jrpc_url: parse_jrpc_provider_url(&config_file.jrpc_provider)
                .expect("Bad JSON-RPC provider url"),
            retry_strategy_max_wait_time: Duration::from_secs(
                config_file.retry_max_wait_time_in_seconds,
            ),
            fee_history_window: config_file.fee_history_window,
            reward_percentiles: RewardPercentiles { slow, medium, fast },
        };

        (config, clap.command)
    }
}

/// Reads the provider either as a literal URL or as the name of an
/// environment variable holding one, so credentials can stay out of the
/// config file.
fn parse_jrpc_provider_url(s: &str) -> anyhow::Result<Url> {
    if let Ok(url) = Url::parse(s) {
        Ok(url)
    } else {
        Ok(Url::parse(std::env::var(s)?.as_str())?)
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(name = "block-utils")]
#[clap(bin_name = "block-utils")]
#[clap(author, version, about, long_about = None)]
struct Clap {
    /// Only show log messages at or above this level. `INFO` by default.
    #[clap(short, long, default_value = "info")]
    log_level: LevelFilter,
    /// The filepath of the TOML configuration file.
    #[clap(long, parse(from_os_str))]
    config_file: PathBuf,
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Finds the block mined nearest to a unix timestamp.
    FindBlock {
        /// Target timestamp in milliseconds since the unix epoch.
        #[clap(long)]
        timestamp_ms: u64,
    },
    /// Estimates slow, medium and fast gas price tiers.
    GasPrice {
        /// Number of recent blocks to sample fee history from. Defaults to
        /// the config file's value.
        #[clap(long)]
        window: Option<u64>,
    },
}

/// Represents the TOML config file.
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
struct ConfigFile {
    chain_name: String,
    /// A URL, or the name of an environment variable containing one.
    jrpc_provider: String,
    #[serde(default = "serde_defaults::fee_history_window")]
    fee_history_window: u64,
    /// Slow, medium and fast reward percentiles, in that order.
    #[serde(default = "serde_defaults::reward_percentiles")]
    reward_percentiles: [f64; 3],
    #[serde(default = "serde_defaults::retry_max_wait_time_in_seconds")]
    retry_max_wait_time_in_seconds: u64,
}

impl ConfigFile {
    /// Tries to create a [`ConfigFile`] from a TOML file.
    fn from_file(file_path: &Path) -> Result<Self, ConfigError> {
        let string = read_to_string(file_path)?;
        toml::from_str(&string).map_err(ConfigError::Toml)
    }
}

/// These should be expressed as constants once
/// https://github.com/serde-rs/serde/issues/368 is fixed.
mod serde_defaults {
    pub fn fee_history_window() -> u64 {
        crate::gas_price::DEFAULT_FEE_HISTORY_WINDOW
    }

    pub fn reward_percentiles() -> [f64; 3] {
        [10.0, 50.0, 90.0]
    }

    pub fn retry_max_wait_time_in_seconds() -> u64 {
        60
    }
}
