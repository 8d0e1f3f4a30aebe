// region:    --- Imports
use super::session::{AuthError, Claims};
use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, error, warn};

// endregion: --- Imports

// region:    --- Capability
/// 보호된 연산이 요구하는 권한
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Sell,
    Buy,
}

impl Claims {
    /// 로그인 시점 권한에 `capability`가 없으면 `Forbidden`
    pub fn require(&self, capability: Capability) -> Result<()> {
        let granted = match capability {
            Capability::Sell => self.roles.can_sell,
            Capability::Buy => self.roles.can_buy,
        };
        if granted {
            Ok(())
        } else {
            warn!(
                "{:<12} --> 권한 부족: account={}, required={:?}",
                "Gatekeeper", self.account_id, capability
            );
            Err(AppError::Forbidden(match capability {
                Capability::Sell => "판매 권한이 필요합니다.".to_string(),
                Capability::Buy => "구매 권한이 필요합니다.".to_string(),
            }))
        }
    }
}

// endregion: --- Capability

// region:    --- Middleware
/// 요청을 인증한 원본 토큰. 로그아웃에서 사용한다.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// `Authorization: Bearer <token>` 헤더에서 토큰 추출
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// 유효한 세션을 요구하는 미들웨어
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        debug!("{:<12} --> 베어러 토큰 없음", "Gatekeeper");
        AppError::Unauthenticated
    })?;

    let claims = state.sessions.validate(&token).await.map_err(|e| {
        match &e {
            AuthError::Unavailable(reason) => {
                error!("{:<12} --> 세션 저장소 장애, 요청 거부: {}", "Gatekeeper", reason)
            }
            other => debug!("{:<12} --> 세션 거부: {}", "Gatekeeper", other),
        }
        AppError::from(e)
    })?;

    debug!("{:<12} --> 인증됨: account={}", "Gatekeeper", claims.account_id);
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(SessionToken(token));

    Ok(next.run(request).await)
}

// endregion: --- Middleware

// endregion: --- Tests
