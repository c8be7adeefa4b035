//! Configuration file parsing for finch.toml.

use finch_vm_core::VmConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// VM limits and tracing
    #[serde(default)]
    pub vm: VmConfig,
}

/// Load configuration from a file or search for default config files.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = match path {
        Some(path) if !path.exists() => {
            anyhow::bail!("Config file {} does not exist", path.display())
        }
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

/// Search for configuration file in the current directory and parent directories.
fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_ancestors(&cwd)
}

fn find_config_in_ancestors(start: &Path) -> Option<PathBuf> {
    const CONFIG_NAMES: &[&str] = &["finch.toml", ".finchrc.toml"];

    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        dir = current.parent();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.vm, VmConfig::default());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[vm]
max_call_depth = 256
trace_fibers = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.vm.max_call_depth, 256);
        assert!(config.vm.trace_fibers);
        assert_eq!(
            config.vm.max_heap_objects,
            VmConfig::default().max_heap_objects
        );
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.vm, VmConfig::default());
    }

    #[test]
    fn test_unknown_vm_key_is_ignored() {
        let config: Config = toml::from_str("[vm]\nfuture_option = 1\n").unwrap();
        assert_eq!(config.vm, VmConfig::default());
    }

    #[test]
    fn test_find_config_in_ancestors() {
        let root = std::env::temp_dir().join(format!("finch-config-{}", std::process::id()));
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join("finch.toml"), "[vm]\nmax_call_depth = 8\n").unwrap();

        let found = find_config_in_ancestors(&nested).unwrap();
        assert_eq!(found, root.join("finch.toml"));
        let config = load_config(Some(&found)).unwrap();
        assert_eq!(config.vm.max_call_depth, 8);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_explicit_config() {
        let err = load_config(Some(Path::new("no/such/finch.toml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
