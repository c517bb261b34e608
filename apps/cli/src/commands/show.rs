//! `show` command: print a source once.

use crate::cli::{Output, SourceArgs};
use clap::Args;
use hotconf_config::Configurator;

/// Open a configuration source and print it.
#[derive(Args)]
pub struct ShowCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Dotted path of the section to print; the whole tree when omitted
    #[arg(long, short)]
    pub section: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "json", ignore_case = true)]
    pub output: Output,
}

impl ShowCommand {
    pub async fn execute(self) -> anyhow::Result<()> {
        let props = self.source.options()?;
        let configurator = Configurator::open(&self.source.driver, &props).await?;

        let tree = match &self.section {
            Some(section) => configurator.get(section).await,
            None => configurator.snapshot().await.unwrap_or_default(),
        };
        println!("{}", self.output.render(&tree));

        configurator.close().await?;
        Ok(())
    }
}
