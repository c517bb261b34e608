//! Entry point for the `hotconf` command-line tool.
//!
//! - `parse`: parse `key=value;` text and print the tree
//! - `show`: open a configuration source and print it once
//! - `watch`: stream reconfigurations from a source until Ctrl-C

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Command};
use hotconf_config::DriverRegistry;

fn register_drivers(registry: &DriverRegistry) -> anyhow::Result<()> {
    hotconf_driver_file::register(registry)?;
    hotconf_driver_sql::register(registry)?;
    hotconf_driver_rest::register(registry)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format)?;
    register_drivers(DriverRegistry::global())?;

    match cli.command {
        Command::Parse(cmd) => cmd.execute(),
        Command::Show(cmd) => cmd.execute().await,
        Command::Watch(cmd) => cmd.execute().await,
    }
}
