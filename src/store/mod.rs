//! 영속 저장소
//!
//! 계정, 세션, 경매, 입찰, 낙찰 기록, 알림 행을 보관한다. 경매 상태를 바꾸는 두 연산
//! (`append_bid`, `close_and_settle`)은 저장소 수준에서도 조건부로 원자 실행되므로,
//! 프로세스 내 경매별 잠금이 없는 다른 인스턴스와 같은 저장소를 공유해도 불변식이 깨지지 않는다.

// region:    --- Imports
use crate::auth::session::SessionRecord;
use crate::bidding::model::{
    Account, Auction, Bid, NewAccount, NewAuction, NewBid, Notification, Settlement,
    WinnerRecord,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// endregion: --- Imports

// region:    --- Modules
pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

// endregion: --- Modules

// region:    --- Auction Store Trait
/// 저장소 트레이트
#[async_trait]
pub trait AuctionStore: Send + Sync {
    // -- 계정
    /// 이메일이 이미 있으면 `EmailTaken`
    async fn insert_account(&self, account: NewAccount) -> Result<Account>;
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    // -- 세션
    async fn insert_session(&self, session: &SessionRecord) -> Result<()>;
    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>>;
    /// 아직 살아 있는 세션이면 `expires_at`을 `at`으로 당긴다. 바뀌었으면 `true`.
    async fn expire_session(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool>;
    /// `before` 이전에 만료된 세션 행 삭제
    async fn purge_sessions(&self, before: DateTime<Utc>) -> Result<u64>;

    // -- 경매
    async fn insert_auction(&self, auction: NewAuction) -> Result<Auction>;
    async fn find_auction(&self, auction_id: i64) -> Result<Option<Auction>>;
    /// 상태가 OPEN인 경매 (마감 시각이 지났을 수 있음)
    async fn list_open_auctions(&self) -> Result<Vec<Auction>>;
    /// 마감 시각이 지났지만 아직 OPEN인 경매 id
    async fn due_auction_ids(&self, now: DateTime<Utc>) -> Result<Vec<i64>>;

    // -- 입찰
    /// 비교 후 추가. 경매가 `placed_at` 시점에 열려 있고 금액이 기준을 넘을 때만
    /// 입찰을 추가하고 최고가를 같은 단위로 갱신한다. 조건이 깨졌으면 `None`.
    async fn append_bid(&self, bid: NewBid) -> Result<Option<Bid>>;
    /// 한 경매의 입찰 (placed_at, id 오름차순)
    async fn list_bids(&self, auction_id: i64) -> Result<Vec<Bid>>;
    /// 계정이 입찰자이거나 경매 소유자인 입찰 (최신순)
    async fn list_bids_involving(&self, account_id: i64) -> Result<Vec<Bid>>;

    // -- 정산
    /// OPEN → CLOSED 전이를 먼저 수행한 뒤, 같은 단위 안에서 입찰을 읽어 낙찰자를 정하고
    /// 낙찰 기록과 낙찰 알림을 저장한다. 전이 이후에는 `append_bid`가 실패하므로 낙찰 금액은
    /// 항상 수락된 입찰의 최댓값이다. 이미 CLOSED였으면 아무것도 쓰지 않고 `None`.
    async fn close_and_settle(
        &self,
        auction_id: i64,
        closed_at: DateTime<Utc>,
    ) -> Result<Option<Settlement>>;
    async fn find_winner(&self, auction_id: i64) -> Result<Option<WinnerRecord>>;

    // -- 알림
    async fn list_notifications(&self, account_id: i64) -> Result<Vec<Notification>>;
    /// 소유자의 알림만 삭제한다. 삭제했으면 `true`.
    async fn delete_notification(&self, notification_id: i64, account_id: i64) -> Result<bool>;
}

// endregion: --- Auction Store Trait
