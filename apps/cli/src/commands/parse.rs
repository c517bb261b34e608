//! `parse` command: decode `key=value;` text.

use crate::cli::Output;
use clap::Args;
use hotconf_config::Options;
use std::io::Read;

/// Parse escaped `key=value;` text and print the resulting tree.
#[derive(Args)]
pub struct ParseCommand {
    /// Text to parse; read from stdin when omitted
    pub text: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "json", ignore_case = true)]
    pub output: Output,
}

impl ParseCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let text = match self.text {
            Some(text) => text,
            None => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                text
            }
        };
        println!("{}", render(&text, self.output)?);
        Ok(())
    }
}

fn render(text: &str, output: Output) -> anyhow::Result<String> {
    let options = Options::new();
    options.parse(text)?;
    Ok(output.render(&options))
}
