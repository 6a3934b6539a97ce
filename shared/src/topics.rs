//! Desired/observed topic model and the reconciliation policy shared by the
//! cluster-admin and managed-service reconcilers.
//!
//! Everything here is pure: the reconcilers fetch live state, hand it to
//! [`plan`] (or [`missing_topics`]) and issue whatever comes back.

use std::collections::HashSet;

use serde::Deserialize;

/// Partition count or replication factor meaning "let the broker decide".
pub const BROKER_DEFAULT: i32 = -1;

/// Topic config applied to every topic created on the cluster.
pub const CLEANUP_POLICY_KEY: &str = "cleanup.policy";
pub const CLEANUP_POLICY_DELETE: &str = "delete";

/// A configured topic, named relative to the deployment origin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DesiredTopic {
    pub name: String,
    #[serde(alias = "numPartitions")]
    pub num_partitions: i32,
}

impl DesiredTopic {
    pub fn new(name: impl Into<String>, num_partitions: i32) -> Self {
        Self {
            name: name.into(),
            num_partitions,
        }
    }

    /// Effective topic name on the cluster.
    pub fn qualified_name(&self, origin: &str) -> String {
        qualified_name(origin, &self.name)
    }
}

/// A topic as reported by the cluster metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedTopic {
    pub name: String,
    /// Partition ids.
    pub partitions: Vec<i32>,
}

impl ObservedTopic {
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}

/// Request to widen an existing topic by `count` partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionIncrease {
    pub topic: String,
    /// Partitions the topic has right now.
    pub current: usize,
    /// Partitions to add; always positive.
    pub count: usize,
}

impl PartitionIncrease {
    /// Partition count the topic ends up with.
    pub fn target(&self) -> usize {
        self.current + self.count
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCreation {
    pub topic: String,
    pub num_partitions: i32,
    pub replication_factor: i32,
    pub config: Vec<(String, String)>,
}

/// Corrective calls needed to bring a cluster in line with the desired list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub partition_increases: Vec<PartitionIncrease>,
    pub topic_creations: Vec<TopicCreation>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.partition_increases.is_empty() && self.topic_creations.is_empty()
    }
}

pub fn qualified_name(origin: &str, name: &str) -> String {
    format!("{origin}.{name}")
}

/// Looks up the desired entry whose qualified name is `qualified`.
pub fn find_desired<'a>(
    desired: &'a [DesiredTopic],
    origin: &str,
    qualified: &str,
) -> Option<&'a DesiredTopic> {
    desired
        .iter()
        .find(|topic| topic.qualified_name(origin) == qualified)
}

/// Desired topics absent from `observed`, in desired order.
pub fn missing_topics<'a, I, S>(
    desired: &'a [DesiredTopic],
    origin: &str,
    observed: I,
) -> Vec<&'a DesiredTopic>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let existing: HashSet<String> = observed
        .into_iter()
        .map(|name| name.as_ref().to_string())
        .collect();
    desired
        .iter()
        .filter(|topic| !existing.contains(&topic.qualified_name(origin)))
        .collect()
}

/// Observed topics with fewer partitions than their desired entry, in
/// observed order. Topics without a desired entry are left alone.
pub fn under_provisioned(
    desired: &[DesiredTopic],
    origin: &str,
    observed: &[ObservedTopic],
) -> Vec<PartitionIncrease> {
    observed
        .iter()
        .filter_map(|topic| {
            let wanted = find_desired(desired, origin, &topic.name)?.num_partitions;
            let wanted = usize::try_from(wanted).ok()?;
            let current = topic.partition_count();
            (current < wanted).then(|| PartitionIncrease {
                topic: topic.name.clone(),
                current,
                count: wanted - current,
            })
        })
        .collect()
}

pub fn plan(desired: &[DesiredTopic], origin: &str, observed: &[ObservedTopic]) -> SyncPlan {
    let partition_increases = under_provisioned(desired, origin, observed);
    let topic_creations = missing_topics(desired, origin, observed.iter().map(|t| &t.name))
        .into_iter()
        .map(|topic| {
            let name = topic.qualified_name(origin);
            // Unreachable while the missing list comes from `desired` itself.
            let num_partitions =
                find_desired(desired, origin, &name).map_or(BROKER_DEFAULT, |t| t.num_partitions);
            TopicCreation {
                topic: name,
                num_partitions,
                replication_factor: BROKER_DEFAULT,
                config: vec![(
                    CLEANUP_POLICY_KEY.to_string(),
                    CLEANUP_POLICY_DELETE.to_string(),
                )],
            }
        })
        .collect();
    SyncPlan {
        partition_increases,
        topic_creations,
    }
}
