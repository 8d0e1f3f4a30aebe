//! 경매별 직렬화 지점
//!
//! 같은 경매에 대한 입찰 수락과 종료/정산은 이 잠금 아래에서만 실행된다. 잠금 범위는
//! 항상 경매 하나이며, 대기 시간이 한도를 넘으면 `Busy`로 실패한다.

// region:    --- Imports
use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::warn;

// endregion: --- Imports

// region:    --- Auction Locks
type Slots = Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>;

pub struct AuctionLocks {
    slots: Slots,
    timeout: Duration,
}

impl AuctionLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    /// 경매 잠금 획득. 한도 안에 얻지 못하면 `Busy`.
    pub async fn acquire(&self, auction_id: i64) -> Result<AuctionGuard> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(slots.entry(auction_id).or_default())
        };

        match tokio::time::timeout(self.timeout, Arc::clone(&slot).lock_owned()).await {
            Ok(guard) => Ok(AuctionGuard {
                auction_id,
                slot,
                slots: Arc::clone(&self.slots),
                guard: Some(guard),
            }),
            Err(_) => {
                warn!(
                    "{:<12} --> 경매 잠금 대기 시간 초과: auction={}",
                    "Locks", auction_id
                );
                Err(AppError::Busy)
            }
        }
    }

    /// 기다리지 않고 잠금을 시도한다. 다른 작업이 잡고 있으면 `None`.
    pub fn try_acquire(&self, auction_id: i64) -> Option<AuctionGuard> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(slots.entry(auction_id).or_default())
        };

        let guard = Arc::clone(&slot).try_lock_owned().ok()?;
        Some(AuctionGuard {
            auction_id,
            slot,
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        })
    }

    /// 현재 잠금 슬롯 수
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 경매 잠금 보유 증표. 해제 시 아무도 쓰지 않는 슬롯은 제거한다.
pub struct AuctionGuard {
    auction_id: i64,
    slot: Arc<AsyncMutex<()>>,
    slots: Slots,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AuctionGuard {
    fn drop(&mut self) {
        self.guard.take();

        // 슬롯 복제는 맵 잠금 안에서만 일어나므로, 맵 + 자신 외의 참조가 없으면 안전하게 제거할 수 있다
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = slots.get(&self.auction_id) {
            if Arc::ptr_eq(existing, &self.slot) && Arc::strong_count(&self.slot) == 2 {
                slots.remove(&self.auction_id);
            }
        }
    }
}

// endregion: --- Auction Locks

// endregion: --- Tests
