use crate::store::{FileStore, DEFAULT_HOURLY_RATE, DEFAULT_LOOP_RATE};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

/// Defaults applied when the store has no persisted value yet. Written out
/// on first run so users have a file to edit.
#[derive(Serialize, Deserialize, Debug)]
pub struct Config {
    pub default_hourly_rate: f64,
    pub default_loop_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_hourly_rate: DEFAULT_HOURLY_RATE,
            default_loop_rate: DEFAULT_LOOP_RATE,
        }
    }
}

pub fn load_config() -> Result<Config> {
    let mut path = FileStore::base_dir()?;
    path.push("config.json");

    if !path.exists() {
        let config = Config::default();
        let data = serde_json::to_string_pretty(&config)?;
        fs::write(&path, data)?;
        return Ok(config);
    }

    let data = fs::read_to_string(&path)?;
    let config = serde_json::from_str(&data)?;
    Ok(config)
}
