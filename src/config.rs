use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use crate::error::{Result, RelayError};

fn default_session_timeout_secs() -> u64 {
    60
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".marian-relay/log")
}

/// Process-wide settings loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP API binds to
    pub host: String,
    /// Port the HTTP API listens on
    pub port: u16,
    /// Path to the JSON file describing the language pairs
    pub services_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the marian-server binary
    pub binary_path: String,
    /// Deadline for one connect/send/receive session against an engine
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
}

impl EngineConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the rolling log file
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8888,
                services_path: PathBuf::from("services.json"),
            },
            engine: EngineConfig {
                binary_path: "marian-server".to_string(),
                session_timeout_secs: default_session_timeout_secs(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| RelayError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RelayError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| RelayError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.engine.binary_path.trim().is_empty() {
            return Err(RelayError::Config("engine.binary_path must not be empty".to_string()));
        }
        if self.engine.session_timeout_secs == 0 {
            return Err(RelayError::Config("engine.session_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

/// One language pair's engine definition from the services file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub host: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
    /// Engine launch configuration; absent or empty means the pair has no engine
    #[serde(default)]
    pub configuration: Option<String>,
    #[serde(default)]
    pub sourcebpe: Option<String>,
    #[serde(default)]
    pub targetbpe: Option<String>,
    #[serde(default)]
    pub sourcespm: Option<String>,
    #[serde(default)]
    pub targetspm: Option<String>,
}

impl ServiceEntry {
    pub fn launch_configuration(&self) -> Option<&str> {
        self.configuration
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn endpoint(&self) -> String {
        format!("ws://{}:{}/translate", self.host, self.port)
    }
}

// Services files in the wild carry the port both as a number and as a string.
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(n) => Ok(n),
        Port::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port '{}'", s))),
    }
}

/// source language -> target language -> entry
///
/// Entries are shared: workers hold `Arc` clones of the parsed entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceConfig {
    pub pairs: BTreeMap<String, BTreeMap<String, Arc<ServiceEntry>>>,
}

impl ServiceConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("Failed to read services file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let services: Self = serde_json::from_str(content)
            .map_err(|e| RelayError::Config(format!("Failed to parse services file: {}", e)))?;
        services.validate()?;
        Ok(services)
    }

    /// Every launched engine binds its port locally, so a port can belong to
    /// one launchable pair only
    fn validate(&self) -> Result<()> {
        let mut owners: BTreeMap<u16, String> = BTreeMap::new();

        for (source, targets) in &self.pairs {
            for (target, entry) in targets {
                if entry.launch_configuration().is_none() {
                    continue;
                }
                let pair = format!("{}-{}", source, target);
                if let Some(owner) = owners.insert(entry.port, pair.clone()) {
                    return Err(RelayError::Config(format!(
                        "Port {} is assigned to both {} and {}",
                        entry.port, owner, pair
                    )));
                }
            }
        }
        Ok(())
    }

    /// source language -> target languages, in key order
    pub fn languages(&self) -> BTreeMap<String, Vec<String>> {
        self.pairs
            .iter()
            .map(|(source, targets)| (source.clone(), targets.keys().cloned().collect()))
            .collect()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.values().map(BTreeMap::len).sum()
    }
}
