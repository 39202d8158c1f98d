use std::path::PathBuf;

use clap::Parser;

use crate::config::AgentConfig;

#[derive(Parser, Debug)]
pub struct Args {
    #[arg(short, long)]
    pub config: PathBuf,

    #[arg(long)]
    pub dump: bool,

    #[arg(long)]
    pub dump_toml: bool,
}

pub fn execute(args: Args) -> anyhow::Result<()> {
    let config = AgentConfig::from_file(&args.config)?;
    config.validate()?;

    if args.dump {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else if args.dump_toml {
        println!("{}", toml::to_string_pretty(&config)?);
    } else {
        println!("✓ Configuration valid: {}", args.config.display());
        println!();
        println!("Agent:");
        println!("  Type: {}", config.agent.sensor_type);
        println!("  Sector: {}", config.agent.sector.as_deref().unwrap_or("<assigned by monitor>"));
        println!("  Base interval: {}s", config.agent.base_interval_secs);
        println!("  Seed: {}", config.agent.seed.map_or("<entropy>".into(), |s| s.to_string()));
        println!();
        println!("Broker:");
        println!("  Host: {}", config.broker.host);
        println!("  Port: {}", config.broker.port);
        println!("  Keep alive: {}s", config.broker.keep_alive_secs);
        println!();
        println!("Risk:");
        println!("  History size: {}", config.risk.history_size);
        println!("  Alert threshold: {}", config.risk.risk_threshold);
        println!("  Consensus threshold: {}", config.risk.consensus_threshold);
        println!(
            "  Sensitivity bounds: [{}, {}]",
            config.risk.min_sensitivity, config.risk.max_sensitivity
        );
    }

    Ok(())
}
