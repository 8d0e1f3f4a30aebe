// region:    --- Imports
use crate::bidding::commands::AuctionEngine;
use crate::bidding::model::{Auction, AuctionState, Bid, Notification, WinnerRecord};
use crate::error::{AppError, Result};
use serde::Serialize;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Views
/// 경매 상세. 종료된 경매는 낙찰 기록을 함께 돌려준다.
#[derive(Debug, Clone, Serialize)]
pub struct AuctionView {
    #[serde(flatten)]
    pub auction: Auction,
    pub winner: Option<WinnerRecord>,
}

// endregion: --- Views

// region:    --- Query Handlers

/// 마감이 지난 경매를 읽기 전에 정산한다. 다른 작업이 경매를 잡고 있으면 기다리지 않고
/// 저장된 상태로 응답한다.
async fn settle_if_due(engine: &AuctionEngine, auction: &Auction) -> Result<bool> {
    if !auction.is_due(engine.clock().now()) {
        return Ok(false);
    }
    let settled = engine.try_settle_due(auction.id).await?.is_some();
    if !settled {
        warn!(
            "{:<12} --> 정산 대기 중, 이전 상태로 응답: auction={}",
            "Query", auction.id
        );
    }
    Ok(settled)
}

/// 진행 중인 경매 조회
pub async fn list_open_auctions(engine: &AuctionEngine) -> Result<Vec<Auction>> {
    info!("{:<12} --> 진행 중인 경매 조회", "Query");
    let auctions = engine.store().list_open_auctions().await?;
    for auction in &auctions {
        settle_if_due(engine, auction).await?;
    }

    let now = engine.clock().now();
    Ok(auctions
        .into_iter()
        .filter(|auction| auction.is_open_at(now))
        .collect())
}

/// 경매 조회
pub async fn get_auction(engine: &AuctionEngine, auction_id: i64) -> Result<AuctionView> {
    info!("{:<12} --> 경매 조회 id: {}", "Query", auction_id);
    let mut auction = find_auction(engine, auction_id).await?;
    if settle_if_due(engine, &auction).await? {
        auction = find_auction(engine, auction_id).await?;
    }

    let winner = match auction.state {
        AuctionState::Closed => engine.store().find_winner(auction_id).await?,
        AuctionState::Open => None,
    };
    Ok(AuctionView { auction, winner })
}

/// 경매 입찰 조회 (오래된 순)
pub async fn list_auction_bids(engine: &AuctionEngine, auction_id: i64) -> Result<Vec<Bid>> {
    info!("{:<12} --> 경매 입찰 조회 id: {}", "Query", auction_id);
    find_auction(engine, auction_id).await?;
    engine.store().list_bids(auction_id).await
}

/// 내 입찰 이력. 내가 입찰자이거나 내 경매에 들어온 입찰 (최신순)
pub async fn list_my_bid_history(engine: &AuctionEngine, account_id: i64) -> Result<Vec<Bid>> {
    info!("{:<12} --> 입찰 이력 조회 account: {}", "Query", account_id);
    engine.store().list_bids_involving(account_id).await
}

/// 내 알림 조회 (최신순)
pub async fn list_notifications(
    engine: &AuctionEngine,
    account_id: i64,
) -> Result<Vec<Notification>> {
    info!("{:<12} --> 알림 조회 account: {}", "Query", account_id);
    engine.store().list_notifications(account_id).await
}

/// 내 알림 삭제. 남의 알림은 없는 것으로 취급한다.
pub async fn delete_notification(
    engine: &AuctionEngine,
    account_id: i64,
    notification_id: i64,
) -> Result<()> {
    info!(
        "{:<12} --> 알림 삭제 id: {}, account: {}",
        "Query", notification_id, account_id
    );
    if engine
        .store()
        .delete_notification(notification_id, account_id)
        .await?
    {
        Ok(())
    } else {
        Err(AppError::NotFound("알림"))
    }
}

async fn find_auction(engine: &AuctionEngine, auction_id: i64) -> Result<Auction> {
    engine
        .store()
        .find_auction(auction_id)
        .await?
        .ok_or(AppError::NotFound("경매"))
}

// endregion: --- Query Handlers

// endregion: --- Tests
