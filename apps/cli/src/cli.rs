//! Command-line structure.

use crate::commands::{ParseCommand, ShowCommand, WatchCommand};
use crate::logging::LogFormat;
use clap::{Args, Parser, Subcommand, ValueEnum};
use hotconf_config::Options;

/// Inspect and watch hotconf configuration sources.
#[derive(Parser)]
#[command(name = "hotconf")]
#[command(version, about = "Inspect and watch hotconf configuration sources", long_about = None)]
pub struct Cli {
    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "HOTCONF_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Parse `key=value;` text and print the resulting tree
    Parse(ParseCommand),

    /// Open a source and print its configuration once
    Show(ShowCommand),

    /// Open a source and print every reconfiguration until interrupted
    Watch(WatchCommand),
}

/// Which backend to open and how.
#[derive(Args)]
pub struct SourceArgs {
    /// Registered driver name (file, database, rest)
    #[arg(long, short, env = "HOTCONF_DRIVER")]
    pub driver: String,

    /// Driver properties as `key=value;` text, e.g. `fileName=app.json;eventDelay=1s`
    #[arg(long, short, default_value = "", env = "HOTCONF_PROPS")]
    pub props: String,
}

impl SourceArgs {
    /// Parse the driver properties
    pub fn options(&self) -> anyhow::Result<Options> {
        Ok(self.props.parse()?)
    }
}

/// How to print a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum Output {
    /// Pretty-printed JSON
    Json,
    /// One `key=value` entry per line
    Text,
    /// Escaped `key=value;` record text
    Escaped,
}

impl Output {
    /// Render `options` in this format
    pub fn render(self, options: &Options) -> String {
        match self {
            Output::Json => options.as_json(),
            Output::Text => options.format("\n"),
            Output::Escaped => options.to_string(),
        }
    }
}
