use serde::Deserialize;

use crate::topics::DesiredTopic;
use crate::upstash::DEFAULT_API_BASE;

/// Environment variable naming the optional settings file.
pub const CONFIG_FILE_ENV: &str = "TOPIC_SYNC_CONFIG";

fn default_config_file() -> String {
    "topic-sync".into()
}

fn default_origin() -> String {
    "local".into()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.into()
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Self-managed cluster to reconcile; unset for Upstash-only deployments.
    #[serde(default)]
    pub message_broker_url: Option<String>,
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub topics: Vec<DesiredTopic>,
    #[serde(default)]
    pub upstash: Option<UpstashSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstashSettings {
    pub token: String,
    pub cluster_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Settings {
    /// Loads the settings file named by `TOPIC_SYNC_CONFIG` (if present)
    /// overlaid with the process environment.
    pub fn new() -> Result<Self, config::ConfigError> {
        let file = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| default_config_file());
        Self::load(&file)
    }

    pub fn load(file: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(config::Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Consumer group, falling back to one derived from the origin.
    pub fn group_id(&self) -> String {
        if self.group_id.is_empty() {
            format!("{}-group", self.origin)
        } else {
            self.group_id.clone()
        }
    }

    /// Origin-qualified names of all configured topics.
    pub fn qualified_topics(&self) -> Vec<String> {
        self.topics
            .iter()
            .map(|topic| topic.qualified_name(&self.origin))
            .collect()
    }
}
