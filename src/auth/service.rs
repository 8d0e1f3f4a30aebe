//! 계정 등록 / 로그인 / 로그아웃

// region:    --- Imports
use super::password;
use super::session::{IssuedSession, SessionStore};
use crate::bidding::model::{Account, NewAccount, Roles};
use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::store::AuctionStore;
use chrono::Duration;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Requests
/// 계정 등록 요청
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub can_sell: bool,
    #[serde(default)]
    pub can_buy: bool,
}

/// 로그인 요청
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// endregion: --- Requests

// region:    --- Validation
fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = email.len() <= 255
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AppError::Validation("올바른 이메일이 아닙니다.".to_string()));
    }
    Ok(email)
}

fn validate_password(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "비밀번호는 8자 이상이어야 합니다.".to_string(),
        ));
    }
    if password.len() > 128 {
        return Err(AppError::Validation(
            "비밀번호는 128자 이하여야 합니다.".to_string(),
        ));
    }
    Ok(())
}

// endregion: --- Validation

// region:    --- Operations
/// 알 수 없는 계정의 로그인 검증에 쓰는 고정 해시
fn dummy_hash() -> &'static str {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    DUMMY_HASH.get_or_init(|| password::hash_password("unknown-account").unwrap_or_default())
}

/// 해시 계산은 블로킹 작업이므로 별도 스레드에서 실행한다
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))?
}

/// 계정 등록
pub async fn register_account(
    store: &dyn AuctionStore,
    clock: &dyn Clock,
    req: RegisterRequest,
) -> Result<Account> {
    let email = normalize_email(&req.email)?;
    validate_password(&req.password)?;

    let password = req.password;
    let password_hash = blocking(move || password::hash_password(&password)).await?;

    let account = store
        .insert_account(NewAccount {
            email,
            password_hash,
            roles: Roles {
                can_sell: req.can_sell,
                can_buy: req.can_buy,
            },
            created_at: clock.now(),
        })
        .await?;

    info!("{:<12} --> 계정 생성: id={}", "Auth", account.id);
    Ok(account)
}

/// 로그인. 성공하면 로그인 시점 권한을 담은 세션을 발급한다.
pub async fn login(
    store: &dyn AuctionStore,
    sessions: &dyn SessionStore,
    ttl: Duration,
    req: LoginRequest,
) -> Result<IssuedSession> {
    let email = req.email.trim().to_lowercase();
    let password = req.password;
    let Some(account) = store.find_account_by_email(&email).await? else {
        // 없는 계정도 같은 비용의 해시 검증을 거친다
        let _ = blocking(move || password::verify_password(&password, dummy_hash())).await;
        warn!("{:<12} --> 로그인 실패: 알 수 없는 계정", "Auth");
        return Err(AppError::InvalidCredentials);
    };

    let hash = account.password_hash.clone();
    let verified = blocking(move || password::verify_password(&password, &hash)).await?;
    if !verified {
        warn!("{:<12} --> 로그인 실패: account={}", "Auth", account.id);
        return Err(AppError::InvalidCredentials);
    }

    let issued = sessions.create(account.id, account.roles(), ttl).await?;
    info!("{:<12} --> 로그인: account={}", "Auth", account.id);
    Ok(issued)
}

/// 로그아웃. 몇 번을 호출해도 결과는 같다.
pub async fn logout(sessions: &dyn SessionStore, token: &str) -> Result<()> {
    sessions.revoke(token).await
}

// endregion: --- Operations

// endregion: --- Tests
