use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{Error, InternalResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deadline for `run_once_async`.
    #[serde(default = "default_result_timeout", with = "duration_ms")]
    pub result_timeout: Duration,

    /// Prefix of every watcher id registered with the resource graph.
    #[serde(default = "default_watcher_prefix")]
    pub watcher_prefix: String,

    /// Most elements a single block or filter may fan out over.
    #[serde(default = "default_max_block_items")]
    pub max_block_items: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            result_timeout: default_result_timeout(),
            watcher_prefix: default_watcher_prefix(),
            max_block_items: default_max_block_items(),
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }

    pub fn from_str(s: &str) -> InternalResult<Self> {
        from_str(s)
    }
}

fn default_result_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_watcher_prefix() -> String {
    "mql".to_string()
}

fn default_max_block_items() -> usize {
    100_000
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file =
        File::open(path).map_err(|e| Error::Config(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
