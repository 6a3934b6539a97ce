//! Upstash control-plane client. Only topic creation is supported there, so
//! partition counts of existing topics are never changed.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::UpstashSettings;
use crate::error::Result;
use crate::topics::{self, DesiredTopic};

pub const DEFAULT_API_BASE: &str = "https://api.upstash.com/v2/kafka";

/// 7 days.
pub const RETENTION_TIME_MS: u64 = 604_800_000;
/// 256 MiB.
pub const RETENTION_SIZE_BYTES: u64 = 268_435_456;
/// 10 MiB.
pub const MAX_MESSAGE_SIZE_BYTES: u64 = 10_485_760;

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaTopicDetails {
    pub topic_name: String,
}

#[derive(Debug, Serialize)]
struct CreateTopicRequest<'a> {
    name: String,
    partitions: i32,
    retention_time: u64,
    retention_size: u64,
    max_message_size: u64,
    cleanup_policy: &'a str,
    cluster_id: &'a str,
}

pub struct UpstashClient {
    http: Client,
    api_base: String,
    token: String,
    cluster_id: String,
}

impl UpstashClient {
    pub fn new(settings: &UpstashSettings) -> Self {
        Self::with_client(Client::new(), settings)
    }

    pub fn with_client(http: Client, settings: &UpstashSettings) -> Self {
        Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            cluster_id: settings.cluster_id.clone(),
        }
    }

    /// Lists every topic of the configured cluster.
    pub async fn list_topics(&self) -> Result<Vec<KafkaTopicDetails>> {
        let topics = self
            .http
            .get(format!("{}/topics/{}", self.api_base, self.cluster_id))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(topics)
    }

    async fn create_topic(&self, name: String, partitions: i32) -> Result<()> {
        let body = CreateTopicRequest {
            name,
            partitions,
            retention_time: RETENTION_TIME_MS,
            retention_size: RETENTION_SIZE_BYTES,
            max_message_size: MAX_MESSAGE_SIZE_BYTES,
            cleanup_policy: "delete",
            cluster_id: &self.cluster_id,
        };
        self.http
            .post(format!("{}/topic", self.api_base))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Creates the desired topics the cluster lacks, one request at a time.
    /// The first failed request aborts the pass; topics created before it
    /// are kept.
    pub async fn reconcile(&self, desired: &[DesiredTopic], origin: &str) -> Result<()> {
        let existing = self.list_topics().await?;
        let to_add = topics::missing_topics(desired, origin, existing.iter().map(|t| &t.topic_name));

        if to_add.is_empty() {
            info!("No topics to create");
            return Ok(());
        }

        let names = to_add
            .iter()
            .map(|topic| topic.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        info!(topics = %names, "Creating topics");

        for topic in to_add {
            self.create_topic(topic.qualified_name(origin), topic.num_partitions)
                .await?;
        }

        info!("Topics created successfully");
        Ok(())
    }
}
