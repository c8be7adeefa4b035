//! CLI command implementations.

pub mod eval;
pub mod run;

use anyhow::Result;
use finch_vm_core::Vm;
use tracing::debug;

use crate::config::Config;

/// Create a VM from the loaded configuration and run one module in it
pub fn execute(config: &Config, module: &str, source: &str) -> Result<Vm> {
    let mut vm = Vm::new(config.vm.clone()).map_err(|e| anyhow::anyhow!(e.report()))?;
    debug!(module, "running");
    vm.interpret(module, source)
        .map_err(|e| anyhow::anyhow!(e.report()))?;
    Ok(vm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use finch_vm_core::{Value, VmConfig};

    #[test]
    fn test_execute_keeps_globals() {
        let vm = execute(&Config::default(), "main", "var answer = 6 * 7").unwrap();
        assert_eq!(vm.global("answer"), Some(Value::Num(42.0)));
    }

    #[test]
    fn test_execute_reports_runtime_error_with_trace() {
        let err = execute(&Config::default(), "main", "Fiber.abort(\"bad\")").unwrap_err();
        assert_eq!(err.to_string(), "bad\n[line 1] in main");
    }

    #[test]
    fn test_execute_uses_vm_config() {
        let config = Config {
            vm: VmConfig::default().with_max_call_depth(16),
        };
        let err = execute(
            &config,
            "main",
            "class R {\n  static go { R.go }\n}\nR.go",
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Stack overflow."));
    }
}
