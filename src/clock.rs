//! 시간 소스
//!
//! 입찰 마감, 세션 만료, 입찰 시각 부여는 모두 `Clock`을 통해 현재 시각을 얻는다.
//! 테스트는 `ManualClock`으로 시각을 직접 움직인다.

// region:    --- Imports
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

// endregion: --- Imports

// region:    --- Clock
/// 현재 시각 제공자
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 시스템 시계
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 수동으로 움직이는 시계
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// 시각을 지정한 값으로 맞춘다
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    /// 시각을 앞으로 이동한다
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// endregion: --- Clock

// region:    --- Monotonic Stamper
/// 프로세스 안에서 감소하지 않는 입찰 시각을 부여한다
#[derive(Debug, Default)]
pub struct MonotonicStamper {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicStamper {
    pub fn new() -> Self {
        Self::default()
    }

    /// `now`와 직전 시각 중 큰 값을 돌려준다
    pub fn stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let stamped = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(stamped);
        stamped
    }
}

// endregion: --- Monotonic Stamper

// endregion: --- Tests
