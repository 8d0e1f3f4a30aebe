//! 세션 저장소
//!
//! 베어러 토큰은 OS 난수 32바이트를 base64url로 표현한 값이다. 토큰 자체는 저장하지
//! 않고 SHA-256 해시를 키로 세션 행을 보관한다. 토큰 형식이 맞더라도 살아 있는 세션
//! 행이 없으면 인증되지 않는다.

// region:    --- Imports
use crate::bidding::model::Roles;
use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::store::AuctionStore;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

// endregion: --- Imports

/// 토큰 바이트 수
const TOKEN_SIZE: usize = 32;

// region:    --- Models
/// 세션 행
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionRecord {
    pub token_hash: String,
    pub account_id: i64,
    pub can_sell: bool,
    pub can_buy: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// 검증된 세션이 요청 컨텍스트에 붙이는 정보. 권한은 로그인 시점의 스냅샷이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub account_id: i64,
    pub roles: Roles,
    pub expires_at: DateTime<Utc>,
}

/// 새로 발급된 세션
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub account_id: i64,
    pub roles: Roles,
    pub expires_at: DateTime<Utc>,
}

/// 세션 검증 실패 사유. 외부에는 모두 `Unauthenticated`로 보인다.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

impl From<AuthError> for AppError {
    fn from(_: AuthError) -> Self {
        AppError::Unauthenticated
    }
}

// endregion: --- Models

// region:    --- Session Store Trait
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 세션을 만들고 토큰을 돌려준다
    async fn create(&self, account_id: i64, roles: Roles, ttl: Duration) -> Result<IssuedSession>;

    /// 토큰을 검증한다. 저장소 오류도 실패로 처리한다.
    async fn validate(&self, token: &str) -> std::result::Result<Claims, AuthError>;

    /// 세션을 즉시 만료시킨다. 모르는 토큰이나 이미 만료된 토큰은 무시한다.
    async fn revoke(&self, token: &str) -> Result<()>;

    /// 만료된 세션 행 정리
    async fn purge_expired(&self) -> Result<u64>;
}

// endregion: --- Session Store Trait

// region:    --- Persistent Session Store
/// `AuctionStore`의 세션 행을 사용하는 구현
pub struct PersistentSessionStore {
    store: Arc<dyn AuctionStore>,
    clock: Arc<dyn Clock>,
}

impl PersistentSessionStore {
    pub fn new(store: Arc<dyn AuctionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

/// 새 토큰 생성
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_SIZE];
    OsRng.fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// 형식이 맞는 토큰인지 (저장소 조회 전 1차 검사)
fn is_well_formed(token: &str) -> bool {
    general_purpose::URL_SAFE_NO_PAD
        .decode(token)
        .is_ok_and(|bytes| bytes.len() == TOKEN_SIZE)
}

/// 저장 키로 쓰는 토큰 해시
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[async_trait]
impl SessionStore for PersistentSessionStore {
    async fn create(&self, account_id: i64, roles: Roles, ttl: Duration) -> Result<IssuedSession> {
        let token = generate_token();
        let issued_at = self.clock.now();
        let record = SessionRecord {
            token_hash: hash_token(&token),
            account_id,
            can_sell: roles.can_sell,
            can_buy: roles.can_buy,
            issued_at,
            expires_at: issued_at + ttl,
        };
        self.store.insert_session(&record).await?;
        info!("{:<12} --> 세션 발급: account={}", "Session", account_id);

        Ok(IssuedSession {
            token,
            account_id,
            roles,
            expires_at: record.expires_at,
        })
    }

    async fn validate(&self, token: &str) -> std::result::Result<Claims, AuthError> {
        if !is_well_formed(token) {
            return Err(AuthError::SessionNotFound);
        }

        let record = self
            .store
            .find_session(&hash_token(token))
            .await
            .map_err(|e| {
                error!("{:<12} --> 세션 조회 실패: {}", "Session", e);
                AuthError::Unavailable(e.to_string())
            })?
            .ok_or(AuthError::SessionNotFound)?;

        if record.expires_at <= self.clock.now() {
            debug!("{:<12} --> 만료된 세션: account={}", "Session", record.account_id);
            return Err(AuthError::SessionExpired);
        }

        Ok(Claims {
            account_id: record.account_id,
            roles: Roles {
                can_sell: record.can_sell,
                can_buy: record.can_buy,
            },
            expires_at: record.expires_at,
        })
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        if !is_well_formed(token) {
            return Ok(());
        }
        let revoked = self
            .store
            .expire_session(&hash_token(token), self.clock.now())
            .await?;
        if revoked {
            info!("{:<12} --> 세션 폐기", "Session");
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let purged = self.store.purge_sessions(self.clock.now()).await?;
        if purged > 0 {
            info!("{:<12} --> 만료 세션 {}개 삭제", "Session", purged);
        }
        Ok(purged)
    }
}

// endregion: --- Persistent Session Store

// endregion: --- Tests
