//! Configuration loading
//!
//! Optional `.tattlerc.json` searched in the working directory and its
//! parents. CLI flags always win over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = ".tattlerc.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default report title
    pub title: Option<String>,
    /// Default output path for `generate`
    pub output: Option<PathBuf>,
    /// Replay the original event timing while reading
    pub emulate: bool,
}

/// Find and load the config file. Searches `work_dir` then its parents;
/// a missing config is not an error.
pub fn load_config(work_dir: &Path, custom_path: Option<&Path>) -> Result<Config> {
    let path = match custom_path {
        Some(p) => {
            let path = if p.is_absolute() {
                p.to_path_buf()
            } else {
                work_dir.join(p)
            };
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path)
        }
        None => find_config_in_parents(work_dir),
    };

    match path {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in config: {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(d) = dir {
        let candidate = d.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = d.parent();
    }
    None
}
