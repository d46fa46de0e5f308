//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Strafe command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strafe", about = "Strafe multiplayer session")]
pub struct CliArgs {
    /// Host address to join.
    #[arg(long)]
    pub server: Option<String>,

    /// Host port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Join/session password.
    #[arg(long)]
    pub password: Option<String>,

    /// Advertised session name when hosting.
    #[arg(long)]
    pub name: Option<String>,

    /// Gamemode to load when hosting.
    #[arg(long)]
    pub gamemode: Option<String>,

    /// Tracing filter, e.g. `debug` or `info,strafe_session=trace`.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Directory holding `config.ron` instead of the platform default.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Overlay command-line values on a config loaded from disk.
    ///
    /// `--password` sets both the join password and the hosted session's.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(address) = &args.server {
            self.network.server_address = address.clone();
        }
        if let Some(port) = args.port {
            self.network.server_port = port;
        }
        if let Some(password) = &args.password {
            self.network.password = password.clone();
            self.session.server_password = password.clone();
        }
        if let Some(name) = &args.name {
            self.session.server_name = name.clone();
        }
        if let Some(gamemode) = &args.gamemode {
            self.session.default_gamemode = gamemode.clone();
        }
        if let Some(level) = &args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
