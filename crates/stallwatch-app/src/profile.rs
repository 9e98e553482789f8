use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use stallwatch_config::Config;

const APP_DIR: &str = "stallwatch";
const CONFIG_FILE: &str = "config.json";

/// `<user config dir>/stallwatch/config.json`
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let base = dirs::config_dir().context("No user config directory on this system")?;
    Ok(base.join(APP_DIR).join(CONFIG_FILE))
}

/// Write a config full of defaults if none exists at `path` yet.
pub fn init_user_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let json = Config::default().to_json_pretty()?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Created default config at {}", path.display());
    Ok(())
}

/// Resolve, load, override from the environment, and validate.
///
/// An explicit path must exist; the default location is created on first run.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<(Config, PathBuf)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_config_path()?;
            init_user_config(&path)?;
            path
        }
    };

    let mut config = Config::from_file(&path)?;
    config.apply_env_overrides()?;
    config
        .validate()
        .with_context(|| format!("Invalid config in {}", path.display()))?;

    tracing::info!("Loaded config from {}", path.display());
    Ok((config, path))
}
