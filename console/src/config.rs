//! Persisted console defaults (spec.md §1 ambient config: `serde`+`toml`,
//! the same pattern the model repo's frontend declares but never finishes
//! wiring up). Missing or unparsable config files fall back to defaults
//! rather than failing the run — these are conveniences, not requirements.

use std::path::Path;

use serde::Deserialize;

fn default_cycle_budget() -> u64 {
    100_000
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_cycle_budget")]
    pub cycle_budget: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cycle_budget: default_cycle_budget(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text).unwrap_or_else(|e| {
                eprintln!("warning: failed to parse {}: {e}", path.display());
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(Path::new("/nonexistent/jvmcore-console.toml"));
        assert_eq!(config.cycle_budget, default_cycle_budget());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let dir = std::env::temp_dir().join("jvmcore_console_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("partial.toml");
        std::fs::write(&path, "cycle_budget = 42\n").unwrap();

        let config = Config::load(&path);
        assert_eq!(config.cycle_budget, 42);
        assert_eq!(config.log_level, default_log_level());

        std::fs::remove_file(&path).unwrap();
    }
}
