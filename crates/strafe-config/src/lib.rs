//! Configuration for Strafe hosts and clients.
//!
//! Settings persist to disk as RON files and can be overridden from the
//! command line via clap. Every section uses `#[serde(default)]` so older or
//! newer config files still load.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE_NAME, Config, DebugConfig, NetworkConfig, SessionConfig, default_config_dir,
};
pub use error::ConfigError;
