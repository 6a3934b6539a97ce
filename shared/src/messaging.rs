//! Producer and consumer handles for a deployment's origin-qualified topics.
//! The handles are handed out as-is; callers own all produce/consume logic.

use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::FutureProducer;
use rdkafka::ClientConfig;
use tracing::info;

use crate::config::Settings;
use crate::error::{Result, SyncError};

pub struct KafkaMessaging {
    topics: Vec<String>,
    consumer: StreamConsumer,
    producer: FutureProducer,
}

impl KafkaMessaging {
    /// Builds the consumer, subscribed to every configured topic, and the
    /// producer.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let broker = settings.message_broker_url.as_deref().ok_or_else(|| {
            SyncError::Config(::config::ConfigError::NotFound("message_broker_url".into()))
        })?;
        let topics = settings.qualified_topics();
        let group_id = settings.group_id();

        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", &group_id)
            .set("bootstrap.servers", broker)
            .set("enable.auto.commit", "false")
            .create()?;
        let names: Vec<&str> = topics.iter().map(String::as_str).collect();
        consumer.subscribe(&names)?;

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", broker)
            .create()?;

        info!(%group_id, topics = ?topics, "kafka consumer and producer ready");
        Ok(Self {
            topics,
            consumer,
            producer,
        })
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn consumer(&self) -> &StreamConsumer {
        &self.consumer
    }

    pub fn producer(&self) -> &FutureProducer {
        &self.producer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::DesiredTopic;

    #[tokio::test]
    async fn subscribes_to_qualified_topics() {
        let settings = Settings {
            message_broker_url: Some("localhost:9".into()),
            origin: "dev".into(),
            group_id: String::new(),
            topics: vec![DesiredTopic::new("orders", 3), DesiredTopic::new("events", 1)],
            upstash: None,
        };
        let messaging = KafkaMessaging::connect(&settings).await.unwrap();
        assert_eq!(messaging.topics(), ["dev.orders", "dev.events"]);

        let subscription = messaging.consumer().subscription().unwrap();
        let mut subscribed: Vec<_> = subscription
            .elements()
            .iter()
            .map(|e| e.topic().to_string())
            .collect();
        subscribed.sort();
        assert_eq!(subscribed, ["dev.events", "dev.orders"]);
    }

    #[tokio::test]
    async fn requires_a_broker() {
        let settings = Settings {
            message_broker_url: None,
            origin: "dev".into(),
            group_id: String::new(),
            topics: vec![DesiredTopic::new("orders", 3)],
            upstash: None,
        };
        assert!(matches!(
            KafkaMessaging::connect(&settings).await,
            Err(SyncError::Config(_))
        ));
    }
}
