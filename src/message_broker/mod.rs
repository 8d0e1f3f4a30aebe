//! 실시간 이벤트 팬아웃
//!
//! 입찰/종료/낙찰 이벤트를 연결된 클라이언트에게 최선 노력으로 전달한다. 발행은 절대
//! 호출한 연산을 막거나 실패시키지 않는다. 구독자가 없거나 느리면 이벤트는 버려진다.
//! 낙찰 알림의 영속 기록은 저장소가 정산과 함께 남기므로, 여기서 놓친 이벤트는 조회로 복구된다.

// region:    --- Imports
use crate::auction::events::AuctionEvent;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

// endregion: --- Imports

// region:    --- Modules
#[cfg(feature = "kafka")]
pub mod kafka;

// endregion: --- Modules

// region:    --- Event Publisher
/// 이벤트 발행자
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &AuctionEvent);
}

/// 여러 발행자에게 같은 이벤트를 전달
#[derive(Default, Clone)]
pub struct FanOut {
    publishers: Vec<Arc<dyn EventPublisher>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publishers.push(publisher);
        self
    }
}

impl EventPublisher for FanOut {
    fn publish(&self, event: &AuctionEvent) {
        for publisher in &self.publishers {
            publisher.publish(event);
        }
    }
}

// endregion: --- Event Publisher

// region:    --- Live Hub
/// 구독 조건. 둘 다 비어 있으면 모든 이벤트를 받는다.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct EventFilter {
    pub auction_id: Option<i64>,
    pub account_id: Option<i64>,
}

impl EventFilter {
    /// 관심 경매의 이벤트이거나 관심 계정이 관련된 이벤트면 통과
    pub fn matches(&self, event: &AuctionEvent) -> bool {
        if self.auction_id.is_none() && self.account_id.is_none() {
            return true;
        }
        self.auction_id == Some(event.auction_id())
            || (self.account_id.is_some() && self.account_id == event.account_id())
    }
}

/// 프로세스 내 브로드캐스트 채널
#[derive(Clone)]
pub struct LiveHub {
    sender: broadcast::Sender<AuctionEvent>,
}

impl LiveHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuctionEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for LiveHub {
    fn publish(&self, event: &AuctionEvent) {
        match self.sender.send(event.clone()) {
            Ok(receivers) => debug!(
                "{:<12} --> {} 전달: receivers={}",
                "LiveHub",
                event.event_type(),
                receivers
            ),
            Err(_) => debug!(
                "{:<12} --> {} 구독자 없음",
                "LiveHub",
                event.event_type()
            ),
        }
    }
}

// endregion: --- Live Hub

// endregion: --- Tests
