use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum AuctionEvent {
    // 입찰 이벤트
    BidPlaced {
        auction_id: i64,
        bid_id: i64,
        bidder_id: i64,
        amount: i64,
        timestamp: DateTime<Utc>,
    },
    // 경매 종료 이벤트
    AuctionClosed {
        auction_id: i64,
        winner_id: Option<i64>,
        winning_amount: Option<i64>,
        timestamp: DateTime<Utc>,
    },
    // 낙찰 이벤트
    AuctionWon {
        auction_id: i64,
        winner_id: i64,
        amount: i64,
        timestamp: DateTime<Utc>,
    },
}

impl AuctionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AuctionEvent::BidPlaced { .. } => "BidPlaced",
            AuctionEvent::AuctionClosed { .. } => "AuctionClosed",
            AuctionEvent::AuctionWon { .. } => "AuctionWon",
        }
    }

    pub fn auction_id(&self) -> i64 {
        match self {
            AuctionEvent::BidPlaced { auction_id, .. }
            | AuctionEvent::AuctionClosed { auction_id, .. }
            | AuctionEvent::AuctionWon { auction_id, .. } => *auction_id,
        }
    }

    /// 이벤트와 직접 관련된 계정 (입찰자 또는 낙찰자)
    pub fn account_id(&self) -> Option<i64> {
        match self {
            AuctionEvent::BidPlaced { bidder_id, .. } => Some(*bidder_id),
            AuctionEvent::AuctionClosed { winner_id, .. } => *winner_id,
            AuctionEvent::AuctionWon { winner_id, .. } => Some(*winner_id),
        }
    }
}
