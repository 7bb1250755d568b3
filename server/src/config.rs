use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use log::LevelFilter;

/// Per-subsystem logging verbosity, read from the `key=value` configuration
/// file. All three keys are required; the server must not start without
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub game_events_level: LevelFilter,
    pub network_events_level: LevelFilter,
    pub api_events_level: LevelFilter,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Config> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("configuration file {} is not readable", path.display()))?;
        Self::parse(&text).with_context(|| format!("configuration file {} is invalid", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Config> {
        let mut values = HashMap::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                bail!("line {}: expected 'key=value'", i + 1);
            };
            // unrecognized keys are kept around but unused
            values.insert(key.trim().to_lowercase(), value.trim().to_lowercase());
        }

        Ok(Config {
            game_events_level: level_value(&values, "game_events_logging_level")?,
            network_events_level: level_value(&values, "network_events_logging_level")?,
            api_events_level: level_value(&values, "api_events_logging_level")?,
        })
    }
}

fn level_value(values: &HashMap<String, String>, key: &str) -> anyhow::Result<LevelFilter> {
    let value = values
        .get(key)
        .with_context(|| format!("configuration key '{key}' is missing"))?;
    parse_level(value).with_context(|| format!("configuration key '{key}' has an invalid logging level '{value}'"))
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    match value {
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warning" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "critical" => Some(LevelFilter::Error),
        _ => None,
    }
}
