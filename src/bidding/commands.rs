/// 입찰 관련 커맨드 처리
/// 1. 경매 등록
/// 2. 입찰
/// 3. 경매 종료(판매자) / 마감 정산
// region:    --- Imports
use super::locks::AuctionLocks;
use super::model::{Auction, AuctionState, Bid, NewAuction, NewBid, Settlement};
use crate::auction::events::AuctionEvent;
use crate::auth::gatekeeper::Capability;
use crate::auth::session::Claims;
use crate::clock::{Clock, MonotonicStamper};
use crate::error::{AppError, Result};
use crate::message_broker::EventPublisher;
use crate::store::AuctionStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// endregion: --- Imports

// region:    --- Commands
/// 경매 등록 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateAuctionCommand {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub base_price: i64,
    pub closes_at: DateTime<Utc>,
}

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct PlaceBidCommand {
    pub auction_id: i64,
    pub amount: i64,
}

/// 입찰 수락 결과
#[derive(Debug, Serialize, Clone)]
pub struct BidReceipt {
    pub bid: Bid,
    pub highest_bid: i64,
}

// 경매 제목 최대 길이
const MAX_TITLE_LEN: usize = 200;

// endregion: --- Commands

// region:    --- Auction Engine
/// 입찰 원장과 경매 생명주기를 관리한다.
///
/// 한 경매의 상태를 읽고 바꾸는 모든 경로는 같은 경매별 잠금 아래에서 실행되므로
/// "현재 최고가"는 항상 하나의 직렬 순서와 일치한다.
pub struct AuctionEngine {
    store: Arc<dyn AuctionStore>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    locks: AuctionLocks,
    stamper: MonotonicStamper,
}

impl AuctionEngine {
    pub fn new(
        store: Arc<dyn AuctionStore>,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            publisher,
            locks: AuctionLocks::new(lock_timeout),
            stamper: MonotonicStamper::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn AuctionStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// 1. 경매 등록
    pub async fn create_auction(
        &self,
        claims: &Claims,
        cmd: CreateAuctionCommand,
    ) -> Result<Auction> {
        info!("{:<12} --> 경매 등록 요청: {:?}", "Command", cmd);
        claims.require(Capability::Sell)?;

        let title = cmd.title.trim().to_string();
        if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::Validation(format!(
                "제목은 1자 이상 {}자 이하여야 합니다.",
                MAX_TITLE_LEN
            )));
        }
        if cmd.base_price < 0 {
            return Err(AppError::Validation(
                "시작가는 0 이상이어야 합니다.".to_string(),
            ));
        }
        let now = self.clock.now();
        if cmd.closes_at <= now {
            return Err(AppError::Validation(
                "마감 시각은 현재 이후여야 합니다.".to_string(),
            ));
        }

        let auction = self
            .store
            .insert_auction(NewAuction {
                owner_id: claims.account_id,
                title,
                description: cmd.description,
                base_price: cmd.base_price,
                closes_at: cmd.closes_at,
                created_at: now,
            })
            .await?;

        info!("{:<12} --> 경매 등록 완료: id={}", "Command", auction.id);
        Ok(auction)
    }

    /// 2. 입찰
    pub async fn place_bid(&self, claims: &Claims, cmd: PlaceBidCommand) -> Result<BidReceipt> {
        info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);
        claims.require(Capability::Buy)?;
        if cmd.amount <= 0 {
            return Err(AppError::Validation(
                "입찰 금액은 0보다 커야 합니다.".to_string(),
            ));
        }

        let guard = self.locks.acquire(cmd.auction_id).await?;
        let auction = self.load(cmd.auction_id).await?;
        let now = self.stamper.stamp(self.clock.now());

        if auction.state == AuctionState::Closed {
            return Err(AppError::AuctionClosed {
                closes_at: auction.closes_at,
            });
        }
        if now >= auction.closes_at {
            // 정리 작업보다 먼저 마감을 발견한 쓰기 경로가 종료/정산을 수행
            self.settle_locked(&auction).await?;
            return Err(AppError::AuctionClosed {
                closes_at: auction.closes_at,
            });
        }
        if !auction.accepts_amount(cmd.amount) {
            return Err(bid_too_low(&auction));
        }
        if auction.owner_id == claims.account_id {
            return Err(AppError::SelfBid);
        }

        let appended = self
            .store
            .append_bid(NewBid {
                auction_id: auction.id,
                bidder_id: claims.account_id,
                amount: cmd.amount,
                placed_at: now,
            })
            .await?;
        let Some(bid) = appended else {
            return Err(self.explain_rejection(cmd, now).await);
        };
        drop(guard);

        info!(
            "{:<12} --> 입찰 성공: auction={}, 현재 가격 {}",
            "Command", bid.auction_id, bid.amount
        );
        self.publisher.publish(&AuctionEvent::BidPlaced {
            auction_id: bid.auction_id,
            bid_id: bid.id,
            bidder_id: bid.bidder_id,
            amount: bid.amount,
            timestamp: bid.placed_at,
        });

        Ok(BidReceipt {
            highest_bid: bid.amount,
            bid,
        })
    }

    /// 3. 판매자 경매 종료. 이미 종료된 경매는 기존 정산 결과를 돌려준다.
    pub async fn close_auction(&self, claims: &Claims, auction_id: i64) -> Result<Settlement> {
        info!("{:<12} --> 경매 종료 요청: auction={}", "Command", auction_id);
        claims.require(Capability::Sell)?;

        let _guard = self.locks.acquire(auction_id).await?;
        let auction = self.load(auction_id).await?;
        if auction.owner_id != claims.account_id {
            return Err(AppError::NotOwner);
        }

        match auction.state {
            AuctionState::Closed => Ok(Settlement {
                auction_id,
                winner: self.store.find_winner(auction_id).await?,
            }),
            AuctionState::Open => self.settle_locked(&auction).await,
        }
    }

    /// 마감 시각이 지난 OPEN 경매를 종료/정산한다. 이번 호출이 전이를 수행했으면 `Some`.
    pub async fn ensure_settled(&self, auction_id: i64) -> Result<Option<Settlement>> {
        let _guard = self.locks.acquire(auction_id).await?;
        self.settle_if_due_locked(auction_id).await
    }

    /// 읽기 경로용 `ensure_settled`. 다른 작업이 경매 잠금을 잡고 있으면 기다리지 않고 `None`.
    pub async fn try_settle_due(&self, auction_id: i64) -> Result<Option<Settlement>> {
        let Some(_guard) = self.locks.try_acquire(auction_id) else {
            debug!(
                "{:<12} --> 경매 잠금 사용 중, 정산 건너뜀: auction={}",
                "Command", auction_id
            );
            return Ok(None);
        };
        self.settle_if_due_locked(auction_id).await
    }

    /// 마감된 모든 경매 정산. 정산한 경매 수를 돌려준다.
    pub async fn sweep_due(&self) -> Result<usize> {
        let due = self.store.due_auction_ids(self.clock.now()).await?;
        let mut settled = 0;
        for auction_id in due {
            match self.ensure_settled(auction_id).await {
                Ok(Some(_)) => settled += 1,
                Ok(None) => {}
                Err(e) => warn!(
                    "{:<12} --> 마감 정산 실패: auction={}, {:?}",
                    "Command", auction_id, e
                ),
            }
        }
        Ok(settled)
    }

    async fn settle_if_due_locked(&self, auction_id: i64) -> Result<Option<Settlement>> {
        let auction = self.load(auction_id).await?;
        if !auction.is_due(self.clock.now()) {
            return Ok(None);
        }
        self.settle_locked(&auction).await.map(Some)
    }

    async fn load(&self, auction_id: i64) -> Result<Auction> {
        self.store
            .find_auction(auction_id)
            .await?
            .ok_or(AppError::NotFound("경매"))
    }

    /// 경매 잠금을 잡은 상태에서만 호출한다.
    /// 낙찰자 계산과 CLOSED 전이는 저장소가 한 단위로 수행하고, 그 뒤에 이벤트를 발행한다.
    async fn settle_locked(&self, auction: &Auction) -> Result<Settlement> {
        let closed_at = self.clock.now();
        let Some(settlement) = self.store.close_and_settle(auction.id, closed_at).await? else {
            // 저장소를 공유하는 다른 인스턴스가 먼저 정산함
            return Ok(Settlement {
                auction_id: auction.id,
                winner: self.store.find_winner(auction.id).await?,
            });
        };

        let winner = settlement.winner.as_ref();
        info!(
            "{:<12} --> 경매 종료: auction={}, 낙찰자 {:?}",
            "Command",
            auction.id,
            winner.map(|w| w.winner_id)
        );
        self.publisher.publish(&AuctionEvent::AuctionClosed {
            auction_id: auction.id,
            winner_id: winner.map(|w| w.winner_id),
            winning_amount: winner.map(|w| w.amount),
            timestamp: closed_at,
        });
        if let Some(winner) = winner {
            self.publisher.publish(&AuctionEvent::AuctionWon {
                auction_id: auction.id,
                winner_id: winner.winner_id,
                amount: winner.amount,
                timestamp: closed_at,
            });
        }

        Ok(settlement)
    }

    /// 저장소의 조건부 추가가 거절한 이유를 다시 읽어 설명한다
    async fn explain_rejection(&self, cmd: PlaceBidCommand, now: DateTime<Utc>) -> AppError {
        match self.store.find_auction(cmd.auction_id).await {
            Ok(Some(auction)) if !auction.is_open_at(now) => AppError::AuctionClosed {
                closes_at: auction.closes_at,
            },
            Ok(Some(auction)) if !auction.accepts_amount(cmd.amount) => bid_too_low(&auction),
            Ok(Some(_)) => AppError::Busy,
            Ok(None) => AppError::NotFound("경매"),
            Err(e) => e,
        }
    }
}

fn bid_too_low(auction: &Auction) -> AppError {
    AppError::BidTooLow {
        current_highest: auction.highest_bid,
        minimum_bid: auction.minimum_bid(),
    }
}

// endregion: --- Auction Engine

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::SessionRecord;
    use crate::bidding::model::{Account, NewAccount, Notification, Roles, WinnerRecord};
    use crate::clock::ManualClock;
    use crate::message_broker::LiveHub;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    const SELLER: i64 = 1;

    struct Harness {
        engine: Arc<AuctionEngine>,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        hub: LiveHub,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let hub = LiveHub::new(64);
        let engine = Arc::new(AuctionEngine::new(
            store.clone(),
            clock.clone(),
            Arc::new(hub.clone()),
            Duration::from_millis(500),
        ));
        Harness {
            engine,
            store,
            clock,
            hub,
        }
    }

    fn seller() -> Claims {
        Claims {
            account_id: SELLER,
            roles: Roles {
                can_sell: true,
                can_buy: true,
            },
            expires_at: Utc::now() + ChronoDuration::days(1),
        }
    }

    fn buyer(account_id: i64) -> Claims {
        Claims {
            account_id,
            roles: Roles {
                can_sell: false,
                can_buy: true,
            },
            expires_at: Utc::now() + ChronoDuration::days(1),
        }
    }

    impl Harness {
        async fn open_auction(&self, base_price: i64, open_for: ChronoDuration) -> Auction {
            self.engine
                .create_auction(
                    &seller(),
                    CreateAuctionCommand {
                        title: "빈티지 카메라".to_string(),
                        description: String::new(),
                        base_price,
                        closes_at: self.clock.now() + open_for,
                    },
                )
                .await
                .unwrap()
        }

        async fn bid(&self, bidder: i64, auction_id: i64, amount: i64) -> Result<BidReceipt> {
            self.engine
                .place_bid(&buyer(bidder), PlaceBidCommand { auction_id, amount })
                .await
        }
    }

    #[tokio::test]
    async fn equal_first_bid_then_strictly_higher_wins() {
        let h = harness();
        let auction = h.open_auction(50, ChronoDuration::seconds(20)).await;
        let closes_at = auction.closes_at;

        h.clock.set(closes_at - ChronoDuration::seconds(10));
        h.bid(2, auction.id, 50).await.unwrap();

        h.clock.set(closes_at - ChronoDuration::seconds(5));
        let err = h.bid(3, auction.id, 50).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::BidTooLow {
                current_highest: Some(50),
                minimum_bid: 51
            }
        ));
        h.bid(4, auction.id, 75).await.unwrap();

        h.clock.set(closes_at);
        let settlement = h.engine.ensure_settled(auction.id).await.unwrap().unwrap();
        let winner = settlement.winner.unwrap();
        assert_eq!(winner.winner_id, 4);
        assert_eq!(winner.amount, 75);
    }

    #[tokio::test]
    async fn bid_at_deadline_is_rejected_and_closes_auction() {
        let h = harness();
        let auction = h.open_auction(10, ChronoDuration::seconds(30)).await;
        h.bid(2, auction.id, 10).await.unwrap();

        // 정리 작업이 아직 돌지 않은 상태
        h.clock.set(auction.closes_at);
        let err = h.bid(3, auction.id, 500).await.unwrap_err();
        assert!(matches!(err, AppError::AuctionClosed { .. }));

        let stored = h.store.find_auction(auction.id).await.unwrap().unwrap();
        assert_eq!(stored.state, AuctionState::Closed);
        assert_eq!(
            h.store.find_winner(auction.id).await.unwrap().unwrap().winner_id,
            2
        );

        let err = h.bid(3, auction.id, 600).await.unwrap_err();
        assert!(matches!(err, AppError::AuctionClosed { .. }));
    }

    #[tokio::test]
    async fn closing_twice_keeps_single_winner_record() {
        let h = harness();
        let auction = h.open_auction(10, ChronoDuration::minutes(5)).await;
        h.bid(2, auction.id, 20).await.unwrap();

        let first = h.engine.close_auction(&seller(), auction.id).await.unwrap();
        let second = h.engine.close_auction(&seller(), auction.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(h.store.list_notifications(2).await.unwrap().len(), 1);

        // 종료 후 마감 정리도 다시 정산하지 않는다
        h.clock.advance(ChronoDuration::minutes(10));
        assert!(h.engine.ensure_settled(auction.id).await.unwrap().is_none());
        assert_eq!(h.store.list_notifications(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn closing_without_bids_has_no_winner() {
        let h = harness();
        let mut rx = h.hub.subscribe();
        let auction = h.open_auction(10, ChronoDuration::minutes(5)).await;

        let settlement = h.engine.close_auction(&seller(), auction.id).await.unwrap();
        assert!(settlement.winner.is_none());
        assert!(h.store.find_winner(auction.id).await.unwrap().is_none());
        for account_id in [SELLER, 2, 3] {
            assert!(h.store.list_notifications(account_id).await.unwrap().is_empty());
        }

        assert!(matches!(
            rx.recv().await.unwrap(),
            AuctionEvent::AuctionClosed {
                winner_id: None,
                winning_amount: None,
                ..
            }
        ));
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn sequential_bids_accept_only_increases() {
        let h = harness();
        let auction = h.open_auction(1, ChronoDuration::minutes(5)).await;

        let mut accepted = Vec::new();
        for (bidder, amount) in [(2, 100), (3, 105), (4, 99), (5, 110)] {
            match h.bid(bidder, auction.id, amount).await {
                Ok(receipt) => accepted.push(receipt.bid.amount),
                Err(AppError::BidTooLow { .. }) => assert_eq!(amount, 99),
                Err(e) => panic!("unexpected error: {:?}", e),
            }
        }
        assert_eq!(accepted, vec![100, 105, 110]);

        let stored = h.store.find_auction(auction.id).await.unwrap().unwrap();
        assert_eq!(stored.highest_bid, Some(110));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bids_serialize_per_auction() {
        let h = harness();
        let auction = h.open_auction(100, ChronoDuration::minutes(5)).await;

        for _round in 0..20 {
            let mut tasks = Vec::new();
            for (bidder, amount) in [(2, 100), (3, 105), (4, 99), (5, 110)] {
                let engine = Arc::clone(&h.engine);
                let auction_id = auction.id;
                tasks.push(tokio::spawn(async move {
                    engine
                        .place_bid(&buyer(bidder), PlaceBidCommand { auction_id, amount })
                        .await
                        .map(|r| r.bid.amount)
                }));
            }
            for (amount, task) in [100, 105, 99, 110].into_iter().zip(tasks) {
                match task.await.unwrap() {
                    Ok(accepted) => assert_ne!(accepted, 99),
                    Err(AppError::BidTooLow { minimum_bid, .. }) => {
                        assert!(amount < minimum_bid, "{} vs {}", amount, minimum_bid)
                    }
                    Err(e) => panic!("unexpected error for {}: {:?}", amount, e),
                }
            }
        }

        let bids = h.store.list_bids(auction.id).await.unwrap();
        let amounts: Vec<i64> = bids.iter().map(|b| b.amount).collect();
        assert!(amounts.windows(2).all(|w| w[0] < w[1]), "{:?}", amounts);
        assert!(!amounts.contains(&99));
        assert_eq!(amounts.last(), Some(&110));

        let stored = h.store.find_auction(auction.id).await.unwrap().unwrap();
        assert_eq!(stored.highest_bid, Some(110));
    }

    #[tokio::test]
    async fn rejects_self_bid_and_non_buyers() {
        let h = harness();
        let auction = h.open_auction(10, ChronoDuration::minutes(5)).await;

        let err = h
            .engine
            .place_bid(&seller(), PlaceBidCommand { auction_id: auction.id, amount: 10 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SelfBid));

        let mut seller_only = seller();
        seller_only.account_id = 9;
        seller_only.roles.can_buy = false;
        let err = h
            .engine
            .place_bid(&seller_only, PlaceBidCommand { auction_id: auction.id, amount: 10 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn rejects_invalid_amount_and_unknown_auction() {
        let h = harness();
        let auction = h.open_auction(10, ChronoDuration::minutes(5)).await;

        assert!(matches!(
            h.bid(2, auction.id, 0).await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            h.bid(2, 9999, 10).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn only_owner_may_close() {
        let h = harness();
        let auction = h.open_auction(10, ChronoDuration::minutes(5)).await;

        let mut other_seller = seller();
        other_seller.account_id = 77;
        let err = h
            .engine
            .close_auction(&other_seller, auction.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotOwner));

        let err = h
            .engine
            .close_auction(&buyer(2), auction.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn contended_auction_reports_busy() {
        let h = harness();
        let auction = h.open_auction(10, ChronoDuration::minutes(5)).await;

        let _held = h.engine.locks.acquire(auction.id).await.unwrap();
        let err = h.bid(2, auction.id, 10).await.unwrap_err();
        assert!(matches!(err, AppError::Busy));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn read_path_settlement_skips_held_lock() {
        let h = harness();
        let auction = h.open_auction(10, ChronoDuration::seconds(5)).await;
        h.bid(2, auction.id, 10).await.unwrap();
        h.clock.advance(ChronoDuration::seconds(5));

        let held = h.engine.locks.acquire(auction.id).await.unwrap();
        let skipped = tokio::time::timeout(
            Duration::from_millis(100),
            h.engine.try_settle_due(auction.id),
        )
        .await
        .expect("read path must not wait for the lock")
        .unwrap();
        assert!(skipped.is_none());
        let stored = h.store.find_auction(auction.id).await.unwrap().unwrap();
        assert_eq!(stored.state, AuctionState::Open);

        drop(held);
        let settled = h.engine.try_settle_due(auction.id).await.unwrap().unwrap();
        assert_eq!(settled.winner.unwrap().winner_id, 2);
    }

    #[tokio::test]
    async fn create_auction_validates_listing() {
        let h = harness();
        let past = CreateAuctionCommand {
            title: "지난 경매".to_string(),
            description: String::new(),
            base_price: 10,
            closes_at: h.clock.now(),
        };
        assert!(matches!(
            h.engine.create_auction(&seller(), past).await.unwrap_err(),
            AppError::Validation(_)
        ));

        let negative = CreateAuctionCommand {
            title: "음수".to_string(),
            description: String::new(),
            base_price: -1,
            closes_at: h.clock.now() + ChronoDuration::minutes(1),
        };
        assert!(matches!(
            h.engine.create_auction(&seller(), negative).await.unwrap_err(),
            AppError::Validation(_)
        ));

        let by_buyer = CreateAuctionCommand {
            title: "구매자".to_string(),
            description: String::new(),
            base_price: 0,
            closes_at: h.clock.now() + ChronoDuration::minutes(1),
        };
        assert!(matches!(
            h.engine.create_auction(&buyer(2), by_buyer).await.unwrap_err(),
            AppError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn sweep_settles_due_auctions() {
        let h = harness();
        let due = h.open_auction(10, ChronoDuration::seconds(10)).await;
        let later = h.open_auction(10, ChronoDuration::hours(1)).await;
        h.bid(2, due.id, 15).await.unwrap();

        h.clock.advance(ChronoDuration::seconds(11));
        assert_eq!(h.engine.sweep_due().await.unwrap(), 1);
        assert_eq!(h.engine.sweep_due().await.unwrap(), 0);

        let later = h.store.find_auction(later.id).await.unwrap().unwrap();
        assert_eq!(later.state, AuctionState::Open);
        assert_eq!(h.store.list_notifications(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn events_follow_durable_writes() {
        let h = harness();
        let mut rx = h.hub.subscribe();
        let auction = h.open_auction(10, ChronoDuration::minutes(5)).await;

        let receipt = h.bid(2, auction.id, 10).await.unwrap();
        match rx.recv().await.unwrap() {
            AuctionEvent::BidPlaced { bid_id, amount, .. } => {
                assert_eq!(bid_id, receipt.bid.id);
                assert_eq!(amount, 10);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        h.engine.close_auction(&seller(), auction.id).await.unwrap();
        assert!(matches!(
            rx.recv().await.unwrap(),
            AuctionEvent::AuctionClosed {
                winner_id: Some(2),
                ..
            }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            AuctionEvent::AuctionWon { winner_id: 2, amount: 10, .. }
        ));
    }

    /// 종료 직전에 다른 인스턴스가 더 높은 입찰을 넣는 저장소
    struct RacingStore {
        inner: Arc<MemoryStore>,
        late_bid: std::sync::Mutex<Option<NewBid>>,
    }

    #[async_trait]
    impl AuctionStore for RacingStore {
        async fn insert_account(&self, account: NewAccount) -> Result<Account> {
            self.inner.insert_account(account).await
        }
        async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
            self.inner.find_account_by_email(email).await
        }
        async fn insert_session(&self, session: &SessionRecord) -> Result<()> {
            self.inner.insert_session(session).await
        }
        async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>> {
            self.inner.find_session(token_hash).await
        }
        async fn expire_session(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool> {
            self.inner.expire_session(token_hash, at).await
        }
        async fn purge_sessions(&self, before: DateTime<Utc>) -> Result<u64> {
            self.inner.purge_sessions(before).await
        }
        async fn insert_auction(&self, auction: NewAuction) -> Result<Auction> {
            self.inner.insert_auction(auction).await
        }
        async fn find_auction(&self, auction_id: i64) -> Result<Option<Auction>> {
            self.inner.find_auction(auction_id).await
        }
        async fn list_open_auctions(&self) -> Result<Vec<Auction>> {
            self.inner.list_open_auctions().await
        }
        async fn due_auction_ids(&self, now: DateTime<Utc>) -> Result<Vec<i64>> {
            self.inner.due_auction_ids(now).await
        }
        async fn append_bid(&self, bid: NewBid) -> Result<Option<Bid>> {
            self.inner.append_bid(bid).await
        }
        async fn list_bids(&self, auction_id: i64) -> Result<Vec<Bid>> {
            self.inner.list_bids(auction_id).await
        }
        async fn list_bids_involving(&self, account_id: i64) -> Result<Vec<Bid>> {
            self.inner.list_bids_involving(account_id).await
        }
        async fn close_and_settle(
            &self,
            auction_id: i64,
            closed_at: DateTime<Utc>,
        ) -> Result<Option<Settlement>> {
            let late = self.late_bid.lock().unwrap().take();
            if let Some(bid) = late {
                assert!(self.inner.append_bid(bid).await?.is_some());
            }
            self.inner.close_and_settle(auction_id, closed_at).await
        }
        async fn find_winner(&self, auction_id: i64) -> Result<Option<WinnerRecord>> {
            self.inner.find_winner(auction_id).await
        }
        async fn list_notifications(&self, account_id: i64) -> Result<Vec<Notification>> {
            self.inner.list_notifications(account_id).await
        }
        async fn delete_notification(&self, notification_id: i64, account_id: i64) -> Result<bool> {
            self.inner.delete_notification(notification_id, account_id).await
        }
    }

    #[tokio::test]
    async fn winner_is_highest_bid_even_with_foreign_writer() {
        let inner = Arc::new(MemoryStore::new());
        let store = Arc::new(RacingStore {
            inner: inner.clone(),
            late_bid: std::sync::Mutex::new(None),
        });
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = AuctionEngine::new(
            store.clone(),
            clock.clone(),
            Arc::new(LiveHub::new(8)),
            Duration::from_millis(500),
        );

        let auction = engine
            .create_auction(
                &seller(),
                CreateAuctionCommand {
                    title: "레코드판".to_string(),
                    description: String::new(),
                    base_price: 50,
                    closes_at: clock.now() + ChronoDuration::minutes(5),
                },
            )
            .await
            .unwrap();
        engine
            .place_bid(&buyer(2), PlaceBidCommand { auction_id: auction.id, amount: 100 })
            .await
            .unwrap();

        // 다른 인스턴스는 이 엔진의 경매 잠금을 공유하지 않는다
        *store.late_bid.lock().unwrap() = Some(NewBid {
            auction_id: auction.id,
            bidder_id: 3,
            amount: 500,
            placed_at: clock.now(),
        });

        let settlement = engine.close_auction(&seller(), auction.id).await.unwrap();
        let winner = settlement.winner.unwrap();
        assert_eq!((winner.winner_id, winner.amount), (3, 500));

        let stored = inner.find_auction(auction.id).await.unwrap().unwrap();
        assert_eq!(stored.highest_bid, Some(winner.amount));
        assert_eq!(inner.list_notifications(3).await.unwrap().len(), 1);
        assert!(inner.list_notifications(2).await.unwrap().is_empty());
    }
}
// endregion: --- Tests
