//! Eval command - run a snippet passed on the command line.

use anyhow::Result;
use clap::Args;

use crate::config::Config;

#[derive(Args)]
pub struct EvalCommand {
    /// Finch source to run
    pub code: String,

    /// Module name used in stack traces
    #[arg(long, default_value = "eval")]
    pub module: String,
}

impl EvalCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        super::execute(config, &self.module, &self.code)?;
        Ok(())
    }
}
