// region:    --- Imports
use super::EventPublisher;
use crate::auction::events::AuctionEvent;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

// endregion: --- Imports

// region:    --- Kafka Publisher
/// 경매 이벤트를 Kafka 토픽으로 내보내는 발행자. 전송은 별도 태스크에서 수행한다.
#[derive(Clone)]
pub struct KafkaPublisher {
    producer: Arc<FutureProducer>,
    topic: String,
}

impl KafkaPublisher {
    pub fn new(brokers: &str, topic: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self {
            producer: Arc::new(producer),
            topic: topic.to_string(),
        })
    }
}

impl EventPublisher for KafkaPublisher {
    fn publish(&self, event: &AuctionEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!("{:<12} --> 이벤트 직렬화 실패: {:?}", "Producer", e);
                return;
            }
        };
        // 같은 경매의 이벤트는 같은 파티션으로
        let key = event.auction_id().to_string();
        let producer = Arc::clone(&self.producer);
        let topic = self.topic.clone();

        tokio::spawn(async move {
            let record = FutureRecord::to(&topic).key(&key).payload(&payload);
            match producer.send(record, Duration::from_secs(0)).await {
                Ok(_) => debug!(
                    "{:<12} --> Kafka 메시지 전송: topic={}, key={}",
                    "Producer", topic, key
                ),
                Err((e, _)) => warn!("{:<12} --> Kafka 전송 실패: {:?}", "Producer", e),
            }
        });
    }
}

// endregion: --- Kafka Publisher
