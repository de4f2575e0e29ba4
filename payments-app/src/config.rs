//! Configuration loading from flags and environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use payments_types::{ConfirmationPolicy, CurrencyRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration.
#[derive(Debug, Parser)]
#[command(name = "payments-server")]
#[command(author, version, about = "Crypto payment lifecycle service", long_about = None)]
pub struct Config {
    /// Payment window for new payments, in minutes
    #[arg(long, env = "PAYMENT_EXPIRY_MINUTES", default_value_t = 30)]
    pub expiry_minutes: u32,

    /// JSON file mapping currency symbols to required confirmations
    #[arg(long, env = "CONFIRMATION_POLICY_FILE")]
    pub confirmation_policy_file: Option<PathBuf>,

    /// Seconds between expiry sweeps
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub sweep_interval_secs: u64,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Builds the currency registry, applying the confirmation policy file
    /// when one is configured.
    pub fn load_registry(&self) -> anyhow::Result<CurrencyRegistry> {
        let Some(path) = &self.confirmation_policy_file else {
            return Ok(CurrencyRegistry::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading confirmation policy {}", path.display()))?;
        let policy = ConfirmationPolicy::from_json(&raw)
            .with_context(|| format!("parsing confirmation policy {}", path.display()))?;

        Ok(CurrencyRegistry::with_policy(policy))
    }
}
