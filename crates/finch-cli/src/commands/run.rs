//! Run command - execute a Finch script file.

use anyhow::{Context, Result};
use clap::Args;
use finch_vm_core::Vm;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Args)]
pub struct RunCommand {
    /// Script to execute
    pub entry: PathBuf,

    /// Print the compiled bytecode as JSON instead of running
    #[arg(long = "dump-bytecode")]
    pub dump_bytecode: bool,
}

impl RunCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let source = std::fs::read_to_string(&self.entry)
            .with_context(|| format!("Failed to read {}", self.entry.display()))?;
        let module = module_name(&self.entry);

        if self.dump_bytecode {
            let mut vm = Vm::new(config.vm.clone()).map_err(|e| anyhow::anyhow!(e.report()))?;
            let function = vm
                .compile(&module, &source)
                .map_err(|e| anyhow::anyhow!(e.report()))?;
            println!("{}", function.to_json()?);
            return Ok(());
        }

        super::execute(config, &module, &source)?;
        Ok(())
    }
}

/// Module name for a script: its file stem
fn module_name(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string())
}
