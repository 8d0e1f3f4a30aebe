// region:    --- Imports
use crate::auth::session::{PersistentSessionStore, SessionStore};
use crate::bidding::commands::AuctionEngine;
use crate::clock::Clock;
use crate::config::Config;
use crate::message_broker::{EventPublisher, FanOut, LiveHub};
use crate::store::AuctionStore;
use std::sync::Arc;

// endregion: --- Imports

// region:    --- App State
/// 핸들러가 공유하는 상태
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AuctionEngine>,
    pub sessions: Arc<dyn SessionStore>,
    pub store: Arc<dyn AuctionStore>,
    pub hub: LiveHub,
    pub session_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Arc<dyn AuctionStore>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let hub = LiveHub::new(config.event_buffer);
        let publisher = build_publisher(config, &hub)?;
        let engine = Arc::new(AuctionEngine::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            publisher,
            config.bid_lock_timeout,
        ));
        let sessions = Arc::new(PersistentSessionStore::new(Arc::clone(&store), clock));

        Ok(Self {
            engine,
            sessions,
            store,
            hub,
            session_ttl: config.session_ttl,
        })
    }
}

#[cfg(feature = "kafka")]
fn build_publisher(config: &Config, hub: &LiveHub) -> anyhow::Result<Arc<dyn EventPublisher>> {
    use crate::message_broker::kafka::KafkaPublisher;
    use anyhow::Context;
    use tracing::info;

    let mut fanout = FanOut::new().with(Arc::new(hub.clone()));
    if let Some(brokers) = &config.kafka_brokers {
        let kafka = KafkaPublisher::new(brokers, &config.kafka_topic)
            .context("Kafka 프로듀서 생성 실패")?;
        info!(
            "{:<12} --> Kafka 발행 활성화: topic={}",
            "Main", config.kafka_topic
        );
        fanout = fanout.with(Arc::new(kafka));
    }
    Ok(Arc::new(fanout))
}

#[cfg(not(feature = "kafka"))]
fn build_publisher(config: &Config, hub: &LiveHub) -> anyhow::Result<Arc<dyn EventPublisher>> {
    if config.kafka_brokers.is_some() {
        tracing::warn!(
            "{:<12} --> KAFKA_BROKERS가 설정되었지만 kafka feature 없이 빌드됨",
            "Main"
        );
    }
    Ok(Arc::new(FanOut::new().with(Arc::new(hub.clone()))))
}

// endregion: --- App State
