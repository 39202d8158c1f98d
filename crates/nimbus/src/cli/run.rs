//! `nimbus run` subcommand implementation.
//!
//! Starts a sensor agent with configuration layering:
//! 1. TOML config file (base)
//! 2. Environment variables (override)
//! 3. CLI arguments (highest priority)

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;

use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::sampler::{UniformSampler, SECTORS};

use super::logging;

#[derive(Parser, Debug)]
pub struct Args {
    #[arg(short, long, default_value = "nimbus.toml")]
    pub config: PathBuf,

    /// Sector hint. When omitted the monitor assigns one after admission.
    #[arg(short, long, value_parser = parse_sector)]
    pub sector: Option<String>,

    /// Base interval in seconds between publications.
    #[arg(short, long)]
    pub interval: Option<u64>,

    #[arg(short, long, env = "MQTT_BROKER")]
    pub broker: Option<String>,

    #[arg(short, long, env = "MQTT_PORT")]
    pub port: Option<u16>,

    /// RNG seed for reproducible sampling.
    #[arg(long, env = "SEED")]
    pub seed: Option<u64>,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, default_value = "./logs")]
    pub log_dir: PathBuf,

    #[arg(long, default_value = "100")]
    pub log_max_size_mb: u64,

    #[arg(long, default_value = "10")]
    pub log_max_files: usize,
}

fn parse_sector(value: &str) -> Result<String, String> {
    if SECTORS.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(format!(
            "unknown sector '{}', expected one of {:?}",
            value, SECTORS
        ))
    }
}

pub async fn execute(args: Args) -> anyhow::Result<()> {
    let mut config = if args.config.exists() {
        AgentConfig::from_file(&args.config)?
    } else {
        tracing::warn!(
            path = %args.config.display(),
            "Config file not found, using defaults"
        );
        AgentConfig::default()
    };

    if let Some(sector) = args.sector {
        config.agent.sector = Some(sector);
    }
    if let Some(interval) = args.interval {
        config.agent.base_interval_secs = interval;
    }
    if let Some(broker) = args.broker {
        config.broker.host = broker;
    }
    if let Some(port) = args.port {
        config.broker.port = port;
    }
    if let Some(seed) = args.seed {
        config.agent.seed = Some(seed);
    }

    config.validate()?;

    logging::init_logging(logging::LoggingConfig {
        log_dir: args.log_dir,
        max_size_mb: args.log_max_size_mb,
        max_files: args.log_max_files,
        verbose: args.verbose,
    })?;

    tracing::info!(
        sector = ?config.agent.sector,
        interval_secs = config.agent.base_interval_secs,
        broker = %config.broker.host,
        port = config.broker.port,
        "Starting NIMBUS agent"
    );

    let sampler = UniformSampler::new(config.agent.seed);
    let base_interval = config.agent.base_interval_secs;
    let agent = Arc::new(Agent::new(config, Box::new(sampler)));

    agent.connect().await?;

    let interrupt_agent = Arc::clone(&agent);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            interrupt_agent.request_shutdown("operator interrupt");
        }
    });

    agent.run(base_interval).await?;

    tracing::info!(id = %agent.sensor_id(), "Agent shut down cleanly");

    Ok(())
}
