use anyhow::Context;
use shared::{config::Settings, kafka, upstash::UpstashClient};
use tracing::{error, info, warn};

/// Runs every configured reconciler. A failing backend does not stop the
/// other one; the pass fails if any of them did.
async fn run(settings: &Settings) -> anyhow::Result<()> {
    if settings.message_broker_url.is_none() && settings.upstash.is_none() {
        warn!("neither message_broker_url nor upstash configured, nothing to sync");
        return Ok(());
    }

    let mut failed = Vec::new();

    if let Some(broker) = &settings.message_broker_url {
        info!(%broker, "syncing kafka cluster topics");
        if let Err(e) = kafka::sync_topics(broker, &settings.topics, &settings.origin).await {
            error!(%e, %broker, "kafka cluster topic sync failed");
            failed.push("kafka");
        }
    }

    if let Some(upstash) = &settings.upstash {
        info!(cluster_id = %upstash.cluster_id, "syncing upstash topics");
        if let Err(e) = UpstashClient::new(upstash)
            .reconcile(&settings.topics, &settings.origin)
            .await
        {
            error!(%e, cluster_id = %upstash.cluster_id, "upstash topic sync failed");
            failed.push("upstash");
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("topic sync failed for: {}", failed.join(", "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Settings::new().context("loading settings")?;
    if settings.topics.is_empty() {
        warn!("no topics configured");
    }
    info!(
        origin = %settings.origin,
        topics = settings.topics.len(),
        "starting topic-sync"
    );

    run(&settings).await?;

    info!("topic-sync finished");
    Ok(())
}
