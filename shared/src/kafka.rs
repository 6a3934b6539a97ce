//! Cluster-admin topic reconciliation: creates missing topics and widens
//! under-provisioned ones through the Kafka admin API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewPartitions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::ClientConfig;
use tracing::{debug, info};

use crate::error::{Result, SyncError};
use crate::topics::{self, DesiredTopic, ObservedTopic, PartitionIncrease, SyncPlan, TopicCreation};

/// Timeout for the partition-increase call.
pub const CREATE_PARTITIONS_TIMEOUT: Duration = Duration::from_secs(5);

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens administrative connections. The returned admin releases its
/// connection when dropped.
#[async_trait]
pub trait AdminConnector: Send + Sync {
    type Admin: ClusterAdmin;

    async fn connect(&self) -> Result<Self::Admin>;
}

/// Administrative operations used by [`ClusterReconciler`].
#[async_trait]
pub trait ClusterAdmin: Send + Sync {
    async fn fetch_topic_metadata(&self) -> Result<Vec<ObservedTopic>>;

    async fn create_partitions(
        &self,
        increases: &[PartitionIncrease],
        timeout: Duration,
    ) -> Result<()>;

    async fn create_topics(&self, creations: &[TopicCreation]) -> Result<()>;
}

pub struct ClusterReconciler<C> {
    connector: C,
}

impl<C: AdminConnector> ClusterReconciler<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    /// One reconciliation pass. Partitions are widened before missing topics
    /// are created; nothing is rolled back if a later call fails.
    pub async fn reconcile(&self, desired: &[DesiredTopic], origin: &str) -> Result<SyncPlan> {
        let admin = self.connector.connect().await?;
        let observed = admin.fetch_topic_metadata().await?;
        debug!(topics = observed.len(), "fetched cluster topic metadata");

        let plan = topics::plan(desired, origin, &observed);

        if !plan.partition_increases.is_empty() {
            let names = join_names(plan.partition_increases.iter().map(|p| p.topic.as_str()));
            info!(topics = %names, "modifying partitions");
            admin
                .create_partitions(&plan.partition_increases, CREATE_PARTITIONS_TIMEOUT)
                .await?;
        }

        if !plan.topic_creations.is_empty() {
            let names = join_names(plan.topic_creations.iter().map(|c| c.topic.as_str()));
            info!(topics = %names, "creating topics");
            admin.create_topics(&plan.topic_creations).await?;
        }

        if plan.is_empty() {
            info!(%origin, "cluster topics already in sync");
        }
        Ok(plan)
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

/// Connects to a real cluster through librdkafka.
pub struct RdKafkaConnector {
    config: ClientConfig,
}

impl RdKafkaConnector {
    pub fn new(broker: &str) -> Self {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", broker);
        Self { config }
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AdminConnector for RdKafkaConnector {
    type Admin = RdKafkaAdmin;

    async fn connect(&self) -> Result<RdKafkaAdmin> {
        let client: AdminClient<DefaultClientContext> = self.config.create()?;
        Ok(RdKafkaAdmin {
            client: Arc::new(client),
        })
    }
}

pub struct RdKafkaAdmin {
    client: Arc<AdminClient<DefaultClientContext>>,
}

#[async_trait]
impl ClusterAdmin for RdKafkaAdmin {
    async fn fetch_topic_metadata(&self) -> Result<Vec<ObservedTopic>> {
        let client = Arc::clone(&self.client);
        let metadata = tokio::task::spawn_blocking(move || {
            client.inner().fetch_metadata(None, METADATA_TIMEOUT)
        })
        .await??;
        Ok(metadata
            .topics()
            .iter()
            .map(|topic| ObservedTopic {
                name: topic.name().to_string(),
                partitions: topic.partitions().iter().map(|p| p.id()).collect(),
            })
            .collect())
    }

    async fn create_partitions(
        &self,
        increases: &[PartitionIncrease],
        timeout: Duration,
    ) -> Result<()> {
        // librdkafka takes the total partition count, not the increment.
        let partitions: Vec<NewPartitions> = increases
            .iter()
            .map(|increase| NewPartitions::new(&increase.topic, increase.target()))
            .collect();
        let opts = AdminOptions::new()
            .validate_only(false)
            .operation_timeout(Some(timeout));
        let results = self.client.create_partitions(&partitions, &opts).await?;
        for result in results {
            if let Err((topic, code)) = result {
                return Err(SyncError::PartitionIncrease { topic, code });
            }
        }
        Ok(())
    }

    async fn create_topics(&self, creations: &[TopicCreation]) -> Result<()> {
        let new_topics: Vec<NewTopic> = creations
            .iter()
            .map(|creation| {
                creation.config.iter().fold(
                    NewTopic::new(
                        &creation.topic,
                        creation.num_partitions,
                        TopicReplication::Fixed(creation.replication_factor),
                    ),
                    |topic, (key, value)| topic.set(key, value),
                )
            })
            .collect();
        let results = self
            .client
            .create_topics(&new_topics, &AdminOptions::new())
            .await?;
        for result in results {
            if let Err((topic, code)) = result {
                return Err(SyncError::TopicCreation { topic, code });
            }
        }
        Ok(())
    }
}

/// Reconciles `desired` against the cluster reachable at `broker`.
pub async fn sync_topics(broker: &str, desired: &[DesiredTopic], origin: &str) -> Result<SyncPlan> {
    ClusterReconciler::new(RdKafkaConnector::new(broker))
        .reconcile(desired, origin)
        .await
}
