use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rv",
    about = "Reavise mutation engine: auctions, bids, and derived counters",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the engine server with an in-memory store
    Serve(ServeArgs),
    /// Print the default configuration, or validate a config file
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML config file; defaults are used when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Validate this file instead of printing defaults
    #[arg(long)]
    pub check: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["rv", "serve"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert!(args.config.is_none());
            assert!(args.bind.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serve_with_overrides() {
        let cli = Cli::try_parse_from([
            "rv", "serve", "--config", "rv.toml", "--bind", "0.0.0.0:9000",
        ])
        .unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.config, Some(PathBuf::from("rv.toml")));
            assert_eq!(args.bind, Some("0.0.0.0:9000".parse().unwrap()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn bad_bind_address_fails_to_parse() {
        assert!(Cli::try_parse_from(["rv", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn parse_config_check() {
        let cli = Cli::try_parse_from(["rv", "config", "--check", "rv.toml"]).unwrap();
        if let Command::Config(args) = cli.command {
            assert_eq!(args.check, Some(PathBuf::from("rv.toml")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["rv", "--verbose", "config"]).unwrap();
        assert!(cli.verbose);
        let cli = Cli::try_parse_from(["rv", "config", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}
