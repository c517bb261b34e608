//! `watch` command: stream reconfigurations.

use crate::cli::{Output, SourceArgs};
use clap::Args;
use hotconf_config::{Configurable, Configurator, Options};
use std::sync::Arc;
use tracing::info;

/// Print a section every time the source delivers it, until Ctrl-C.
#[derive(Args)]
pub struct WatchCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Dotted path of the section to watch
    #[arg(long, short)]
    pub section: String,

    /// Output format
    #[arg(long, short, value_enum, default_value = "json", ignore_case = true)]
    pub output: Output,
}

struct Printer {
    section: String,
    output: Output,
}

impl Configurable for Printer {
    fn configure(&self, section: &Options, first: bool) {
        let label = if first { "initial" } else { "changed" };
        println!("# {} ({label})", self.section);
        println!("{}", self.output.render(section));
    }
}

impl WatchCommand {
    pub async fn execute(self) -> anyhow::Result<()> {
        let props = self.source.options()?;
        let configurator = Configurator::open(&self.source.driver, &props).await?;

        let printer = Arc::new(Printer {
            section: self.section.clone(),
            output: self.output,
        });
        configurator.register(&self.section, printer).await;
        info!(driver = %self.source.driver, section = %self.section, "watching for changes");

        tokio::signal::ctrl_c().await?;
        info!("interrupted, closing");
        configurator.close().await?;
        Ok(())
    }
}
