//! # Payments Application
//!
//! Binary that wires together all the components:
//! - Load configuration from flags / environment
//! - Build the currency registry and confirmation policy
//! - Create the payment service over the in-memory adapters
//! - Run the expiry sweep in the background
//! - Serve newline-delimited JSON commands on stdin, one result line on stdout

mod commands;
mod config;

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exchange_rates::FixedRates;
use payments_hex::PaymentService;
use payments_repo::{InMemoryOrderBook, InMemoryPaymentRepo};

use crate::commands::{Command, error_response, execute, parse_error_response};
use crate::config::{Config, LogFormat};

type Service = PaymentService<InMemoryPaymentRepo, FixedRates, InMemoryOrderBook>;

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,payments_app=debug,payments_hex=debug".into());

    // stdout carries the command protocol, so logs go to stderr.
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn run_sweeper(service: Arc<Service>, interval: std::time::Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(e) = service.expire_overdue(Utc::now()).await {
            tracing::error!("Expiry sweep failed: {}", e);
        }
    }
}

async fn serve_stdin(service: Arc<Service>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match Command::parse(line) {
            Ok(command) => match execute(service.as_ref(), command, Utc::now()).await {
                Ok(value) => value,
                Err(e) => error_response(&e),
            },
            Err(e) => {
                tracing::warn!("Rejected malformed command: {}", e);
                parse_error_response(&e)
            }
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    tracing::info!("stdin closed");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::parse();
    init_tracing(config.log_format);

    let registry = config.load_registry()?;
    tracing::info!(
        currencies = registry.supported().count(),
        default_confirmations = registry.policy().default_required(),
        expiry_minutes = config.expiry_minutes,
        "Starting payment service"
    );

    let service: Arc<Service> = Arc::new(
        PaymentService::new(
            InMemoryPaymentRepo::new(),
            FixedRates::default(),
            InMemoryOrderBook::new(),
            Arc::new(registry),
        )
        .with_expiry_minutes(config.expiry_minutes),
    );

    let sweeper = tokio::spawn(run_sweeper(service.clone(), config.sweep_interval()));

    tokio::select! {
        result = serve_stdin(service) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    sweeper.abort();
    Ok(())
}
