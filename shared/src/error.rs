use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to create topic {topic}: {code}")]
    TopicCreation { topic: String, code: RDKafkaErrorCode },
    #[error("failed to add partitions to topic {topic}: {code}")]
    PartitionIncrease { topic: String, code: RDKafkaErrorCode },
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
