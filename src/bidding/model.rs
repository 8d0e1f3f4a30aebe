use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// region:    --- Account
/// 계정 권한 스냅샷
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Roles {
    pub can_sell: bool,
    pub can_buy: bool,
}

// 계정 모델
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub can_sell: bool,
    pub can_buy: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn roles(&self) -> Roles {
        Roles {
            can_sell: self.can_sell,
            can_buy: self.can_buy,
        }
    }
}

/// 계정 생성 입력
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub roles: Roles,
    pub created_at: DateTime<Utc>,
}

// endregion: --- Account

// region:    --- Auction
/// 경매 상태. CLOSED는 종착 상태다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuctionState {
    Open,
    Closed,
}

impl AuctionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionState::Open => "OPEN",
            AuctionState::Closed => "CLOSED",
        }
    }
}

impl TryFrom<String> for AuctionState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "OPEN" => Ok(AuctionState::Open),
            "CLOSED" => Ok(AuctionState::Closed),
            other => Err(format!("알 수 없는 경매 상태: {}", other)),
        }
    }
}

// 경매 모델
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Auction {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    pub base_price: i64,
    /// 수락된 입찰 중 최고 금액. 입찰이 없으면 `None`.
    pub highest_bid: Option<i64>,
    pub closes_at: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub state: AuctionState,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Auction {
    /// `now` 시점에 입찰을 받을 수 있는지
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.state == AuctionState::Open && now < self.closes_at
    }

    /// 마감 시각이 지났지만 아직 정산되지 않았는지
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state == AuctionState::Open && now >= self.closes_at
    }

    /// 지금 수락될 수 있는 최소 입찰 금액
    pub fn minimum_bid(&self) -> i64 {
        match self.highest_bid {
            Some(highest) => highest.saturating_add(1),
            None => self.base_price,
        }
    }

    /// 첫 입찰은 시작가 이상, 이후 입찰은 최고가 초과
    pub fn accepts_amount(&self, amount: i64) -> bool {
        match self.highest_bid {
            Some(highest) => amount > highest,
            None => amount >= self.base_price,
        }
    }
}

/// 경매 생성 입력
#[derive(Debug, Clone)]
pub struct NewAuction {
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    pub base_price: i64,
    pub closes_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// endregion: --- Auction

// region:    --- Bid
// 입찰 모델
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    pub placed_at: DateTime<Utc>,
}

/// 입찰 추가 입력
#[derive(Debug, Clone)]
pub struct NewBid {
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    pub placed_at: DateTime<Utc>,
}

// endregion: --- Bid

// region:    --- Settlement
// 낙찰 기록. 경매당 최대 하나이며 수정/삭제되지 않는다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WinnerRecord {
    pub auction_id: i64,
    pub winner_id: i64,
    pub bid_id: i64,
    pub amount: i64,
    pub decided_at: DateTime<Utc>,
}

impl WinnerRecord {
    pub fn from_bid(bid: &Bid, decided_at: DateTime<Utc>) -> Self {
        Self {
            auction_id: bid.auction_id,
            winner_id: bid.bidder_id,
            bid_id: bid.id,
            amount: bid.amount,
            decided_at,
        }
    }
}

/// 종료된 경매의 정산 결과. 입찰이 없었으면 `winner`는 `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub auction_id: i64,
    pub winner: Option<WinnerRecord>,
}

// "낙찰" 알림
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub account_id: i64,
    pub auction_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

// endregion: --- Settlement

// endregion: --- Tests
