//! # NIMBUS
//!
//! Autonomous weather-risk sensing agents coordinating over MQTT.
//!
//! Each agent samples its environment, keeps a rolling history, computes a
//! local risk opinion, gossips beliefs with co-located peers and raises an
//! alert only when its own evidence and the neighborhood agree. A central
//! monitor admits agents into sectors and issues learning feedback; this
//! crate implements the agent side of that contract.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use nimbus::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load configuration
//!     let config = AgentConfig::from_file("nimbus.toml")?;
//!
//!     // Create the agent with a seeded sampler
//!     let sampler = UniformSampler::new(config.agent.seed);
//!     let interval = config.agent.base_interval_secs;
//!     let agent = Agent::new(config, Box::new(sampler));
//!
//!     // Connect, then run until shutdown
//!     agent.connect().await?;
//!     agent.run(interval).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `cli`: Enable the `nimbus` binary with logging and config tooling

pub mod agent;
pub mod brain;
pub mod config;
pub mod network;
pub mod protocol;
pub mod sampler;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

pub use nimbus_core::{Measurement, NimbusError, RiskLevel, ValidationError};

pub mod prelude {
    pub use nimbus_core::{Measurement, RiskLevel};

    pub use crate::agent::{Agent, AgentState};
    pub use crate::config::AgentConfig;
    pub use crate::sampler::{Sampler, UniformSampler};
}
