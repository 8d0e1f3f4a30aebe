// region:    --- Imports
use super::AuctionStore;
use crate::auth::session::SessionRecord;
use crate::bidding::model::{
    Account, Auction, AuctionState, Bid, NewAccount, NewAuction, NewBid, Notification,
    Settlement, WinnerRecord,
};
use crate::bidding::resolver::resolve_winner;
use crate::database::DatabaseManager;
use crate::error::{AppError, Result};
use crate::query::queries;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

// endregion: --- Imports

// region:    --- Postgres Store
/// PostgreSQL 저장소
pub struct PostgresStore {
    db_manager: Arc<DatabaseManager>,
}

impl PostgresStore {
    pub fn new(db_manager: Arc<DatabaseManager>) -> Self {
        Self { db_manager }
    }
}

#[async_trait]
impl AuctionStore for PostgresStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account> {
        sqlx::query_as::<_, Account>(queries::INSERT_ACCOUNT)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.roles.can_sell)
            .bind(account.roles.can_buy)
            .bind(account.created_at)
            .fetch_one(self.db_manager.pool())
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::EmailTaken,
                e => AppError::Database(e),
            })
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(queries::GET_ACCOUNT_BY_EMAIL)
            .bind(email)
            .fetch_optional(self.db_manager.pool())
            .await?;
        Ok(account)
    }

    async fn insert_session(&self, session: &SessionRecord) -> Result<()> {
        sqlx::query(queries::INSERT_SESSION)
            .bind(&session.token_hash)
            .bind(session.account_id)
            .bind(session.can_sell)
            .bind(session.can_buy)
            .bind(session.issued_at)
            .bind(session.expires_at)
            .execute(self.db_manager.pool())
            .await?;
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>> {
        let session = sqlx::query_as::<_, SessionRecord>(queries::GET_SESSION)
            .bind(token_hash)
            .fetch_optional(self.db_manager.pool())
            .await?;
        Ok(session)
    }

    async fn expire_session(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(queries::EXPIRE_SESSION)
            .bind(token_hash)
            .bind(at)
            .execute(self.db_manager.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_sessions(&self, before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(queries::PURGE_SESSIONS)
            .bind(before)
            .execute(self.db_manager.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_auction(&self, auction: NewAuction) -> Result<Auction> {
        let auction = sqlx::query_as::<_, Auction>(queries::INSERT_AUCTION)
            .bind(auction.owner_id)
            .bind(&auction.title)
            .bind(&auction.description)
            .bind(auction.base_price)
            .bind(auction.closes_at)
            .bind(auction.created_at)
            .fetch_one(self.db_manager.pool())
            .await?;
        Ok(auction)
    }

    async fn find_auction(&self, auction_id: i64) -> Result<Option<Auction>> {
        let auction = sqlx::query_as::<_, Auction>(queries::GET_AUCTION)
            .bind(auction_id)
            .fetch_optional(self.db_manager.pool())
            .await?;
        Ok(auction)
    }

    async fn list_open_auctions(&self) -> Result<Vec<Auction>> {
        let auctions = sqlx::query_as::<_, Auction>(queries::GET_OPEN_AUCTIONS)
            .fetch_all(self.db_manager.pool())
            .await?;
        Ok(auctions)
    }

    async fn due_auction_ids(&self, now: DateTime<Utc>) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(queries::GET_DUE_AUCTION_IDS)
            .bind(now)
            .fetch_all(self.db_manager.pool())
            .await?;
        Ok(ids)
    }

    async fn append_bid(&self, bid: NewBid) -> Result<Option<Bid>> {
        self.db_manager
            .transaction(|tx| {
                Box::pin(async move {
                    // 최고가 행 갱신이 같은 경매의 다른 쓰기를 직렬화한다
                    let raised = sqlx::query(queries::RAISE_HIGHEST_BID)
                        .bind(bid.auction_id)
                        .bind(bid.amount)
                        .bind(bid.placed_at)
                        .bind(AuctionState::Open.as_str())
                        .execute(&mut **tx)
                        .await?;
                    if raised.rows_affected() == 0 {
                        debug!(
                            "{:<12} --> 최고가 갱신 조건 불충족: auction={}, amount={}",
                            "Store", bid.auction_id, bid.amount
                        );
                        return Ok(None);
                    }

                    let row = sqlx::query_as::<_, Bid>(queries::INSERT_BID)
                        .bind(bid.auction_id)
                        .bind(bid.bidder_id)
                        .bind(bid.amount)
                        .bind(bid.placed_at)
                        .fetch_one(&mut **tx)
                        .await?;
                    Ok(Some(row))
                })
            })
            .await
    }

    async fn list_bids(&self, auction_id: i64) -> Result<Vec<Bid>> {
        let bids = sqlx::query_as::<_, Bid>(queries::GET_AUCTION_BIDS)
            .bind(auction_id)
            .fetch_all(self.db_manager.pool())
            .await?;
        Ok(bids)
    }

    async fn list_bids_involving(&self, account_id: i64) -> Result<Vec<Bid>> {
        let bids = sqlx::query_as::<_, Bid>(queries::GET_BIDS_INVOLVING)
            .bind(account_id)
            .fetch_all(self.db_manager.pool())
            .await?;
        Ok(bids)
    }

    async fn close_and_settle(
        &self,
        auction_id: i64,
        closed_at: DateTime<Utc>,
    ) -> Result<Option<Settlement>> {
        self.db_manager
            .transaction(|tx| {
                Box::pin(async move {
                    // 상태 전이가 먼저: 이후 다른 인스턴스의 최고가 갱신은 OPEN 조건에서 실패한다
                    let closed = sqlx::query(queries::CLOSE_AUCTION)
                        .bind(auction_id)
                        .bind(closed_at)
                        .bind(AuctionState::Closed.as_str())
                        .bind(AuctionState::Open.as_str())
                        .execute(&mut **tx)
                        .await?;
                    if closed.rows_affected() == 0 {
                        return Ok(None);
                    }

                    let bids = sqlx::query_as::<_, Bid>(queries::GET_AUCTION_BIDS)
                        .bind(auction_id)
                        .fetch_all(&mut **tx)
                        .await?;
                    let winner =
                        resolve_winner(&bids).map(|bid| WinnerRecord::from_bid(bid, closed_at));

                    if let Some(winner) = &winner {
                        sqlx::query(queries::INSERT_WINNER)
                            .bind(winner.auction_id)
                            .bind(winner.winner_id)
                            .bind(winner.bid_id)
                            .bind(winner.amount)
                            .bind(winner.decided_at)
                            .execute(&mut **tx)
                            .await?;
                        sqlx::query(queries::INSERT_NOTIFICATION)
                            .bind(winner.winner_id)
                            .bind(winner.auction_id)
                            .bind(winner.amount)
                            .bind(winner.decided_at)
                            .execute(&mut **tx)
                            .await?;
                    }
                    Ok(Some(Settlement { auction_id, winner }))
                })
            })
            .await
    }

    async fn find_winner(&self, auction_id: i64) -> Result<Option<WinnerRecord>> {
        let winner = sqlx::query_as::<_, WinnerRecord>(queries::GET_WINNER)
            .bind(auction_id)
            .fetch_optional(self.db_manager.pool())
            .await?;
        Ok(winner)
    }

    async fn list_notifications(&self, account_id: i64) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(queries::GET_NOTIFICATIONS)
            .bind(account_id)
            .fetch_all(self.db_manager.pool())
            .await?;
        Ok(notifications)
    }

    async fn delete_notification(&self, notification_id: i64, account_id: i64) -> Result<bool> {
        let result = sqlx::query(queries::DELETE_NOTIFICATION)
            .bind(notification_id)
            .bind(account_id)
            .execute(self.db_manager.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// endregion: --- Postgres Store
