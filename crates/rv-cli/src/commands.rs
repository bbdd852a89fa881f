use anyhow::Context;
use colored::Colorize;

use rv_server::{RvServer, ServerConfig};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Config(args) => cmd_config(args),
    }
}

fn load_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    println!("{} rv server on {}", "▸".green().bold(), config.bind_addr.to_string().bold());
    println!(
        "  Expiry sweep: {}",
        if config.sweep.enabled { "on".green() } else { "off".yellow() }
    );
    println!(
        "  Auditor: {}",
        if config.auditor.enabled { "on".green() } else { "off".yellow() }
    );

    let server = RvServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    match args.check {
        Some(path) => {
            ServerConfig::from_toml_file(&path)?;
            println!("{} {} is valid", "✓".green().bold(), path.display().to_string().bold());
        }
        None => print!("{}", ServerConfig::default().to_toml_string()?),
    }
    Ok(())
}
