/// 주기 작업 스케줄러
/// 1. 마감 시각이 지난 OPEN 경매 종료/정산 (조회/입찰 시점의 지연 정산을 보완)
/// 2. 만료된 세션 행 삭제
// region:    --- Imports
use crate::auth::session::SessionStore;
use crate::bidding::commands::AuctionEngine;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Auction Scheduler
/// 경매 마감 정리 스케줄러
pub struct AuctionScheduler {
    engine: Arc<AuctionEngine>,
    sessions: Arc<dyn SessionStore>,
    sweep_interval: Duration,
    purge_interval: Duration,
}

impl AuctionScheduler {
    pub fn new(
        engine: Arc<AuctionEngine>,
        sessions: Arc<dyn SessionStore>,
        sweep_interval: Duration,
        purge_interval: Duration,
    ) -> Self {
        Self {
            engine,
            sessions,
            sweep_interval,
            purge_interval,
        }
    }

    /// 스케줄러 시작. 두 작업의 핸들을 돌려준다.
    pub fn start(&self) -> (JoinHandle<()>, JoinHandle<()>) {
        let engine = Arc::clone(&self.engine);
        let sweep_interval = self.sweep_interval;
        let sweep = tokio::spawn(async move {
            let mut interval = interval(sweep_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                Self::sweep_due_auctions(&engine).await;
            }
        });

        let sessions = Arc::clone(&self.sessions);
        let purge_interval = self.purge_interval;
        let purge = tokio::spawn(async move {
            let mut interval = interval(purge_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                Self::purge_expired_sessions(sessions.as_ref()).await;
            }
        });

        info!(
            "{:<12} --> 스케줄러 시작: sweep={:?}, purge={:?}",
            "Scheduler", self.sweep_interval, self.purge_interval
        );
        (sweep, purge)
    }

    /// 마감 경매 정산
    async fn sweep_due_auctions(engine: &AuctionEngine) {
        match engine.sweep_due().await {
            Ok(0) => {}
            Ok(settled) => debug!("{:<12} --> 경매 {}건 종료 처리", "Scheduler", settled),
            Err(e) => error!(
                "{:<12} --> 경매 마감 처리 중 오류 발생: {:?}",
                "Scheduler", e
            ),
        }
    }

    /// 만료 세션 삭제
    async fn purge_expired_sessions(sessions: &dyn SessionStore) {
        match sessions.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => debug!("{:<12} --> 만료 세션 {}건 삭제", "Scheduler", purged),
            Err(e) => error!(
                "{:<12} --> 만료 세션 삭제 중 오류 발생: {:?}",
                "Scheduler", e
            ),
        }
    }
}
// endregion: --- Auction Scheduler

// endregion: --- Tests
