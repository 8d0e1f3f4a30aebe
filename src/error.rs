// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, warn};

// endregion: --- Imports

// region:    --- App Error
/// 서비스 전반의 에러 타입
#[derive(Error, Debug)]
pub enum AppError {
    /// 저장소 접근 실패 (인프라 장애)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 세션 없음/만료/위조. 사유는 외부에 구분하지 않는다.
    #[error("인증이 필요합니다.")]
    Unauthenticated,

    /// 이메일 또는 비밀번호 불일치
    #[error("이메일 또는 비밀번호가 올바르지 않습니다.")]
    InvalidCredentials,

    /// 세션은 유효하지만 필요한 권한이 없음
    #[error("권한이 없습니다: {0}")]
    Forbidden(String),

    /// 경매 소유자가 아님
    #[error("경매 소유자만 수행할 수 있습니다.")]
    NotOwner,

    /// 잘못된 입력
    #[error("잘못된 요청입니다: {0}")]
    Validation(String),

    /// 이미 사용 중인 이메일
    #[error("이미 사용 중인 이메일입니다.")]
    EmailTaken,

    /// 종료된 경매에 대한 입찰
    #[error("경매가 이미 종료되었습니다.")]
    AuctionClosed { closes_at: DateTime<Utc> },

    /// 입찰 금액 부족
    #[error("입찰 금액이 현재 가격보다 낮습니다.")]
    BidTooLow {
        current_highest: Option<i64>,
        minimum_bid: i64,
    },

    /// 자신의 경매에 입찰
    #[error("자신의 경매에는 입찰할 수 없습니다.")]
    SelfBid,

    /// 경매별 직렬화 지점 획득 시간 초과
    #[error("다른 입찰을 처리 중입니다. 잠시 후 다시 시도하세요.")]
    Busy,

    /// 대상 없음
    #[error("{0}을(를) 찾을 수 없습니다.")]
    NotFound(&'static str),

    /// 내부 오류
    #[error("Internal error: {0}")]
    Internal(String),
}

/// `AppError`를 사용하는 `Result`
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// 클라이언트가 분기할 수 있는 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "STORAGE_UNAVAILABLE",
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotOwner => "NOT_OWNER",
            AppError::Validation(_) => "INVALID_INPUT",
            AppError::EmailTaken => "EMAIL_TAKEN",
            AppError::AuctionClosed { .. } => "ALREADY_ENDED",
            AppError::BidTooLow { .. } => "LOW_BID",
            AppError::SelfBid => "SELF_BID",
            AppError::Busy => "BUSY",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// 호출자가 같은 요청을 그대로 다시 보내도 되는지 여부
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Busy)
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::NotOwner => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::EmailTaken
            | AppError::AuctionClosed { .. }
            | AppError::BidTooLow { .. }
            | AppError::SelfBid => StatusCode::CONFLICT,
            AppError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // 인프라 장애는 내부 사유를 숨긴다
        let message = match &self {
            AppError::Database(e) => {
                error!("{:<12} --> 저장소 오류: {}", "Error", e);
                "저장소에 접근할 수 없습니다.".to_string()
            }
            AppError::Internal(msg) => {
                error!("{:<12} --> 내부 오류: {}", "Error", msg);
                "내부 서버 오류".to_string()
            }
            AppError::Unauthenticated | AppError::InvalidCredentials | AppError::Forbidden(_) => {
                warn!("{:<12} --> {}", "Error", self);
                self.to_string()
            }
            _ => {
                debug!("{:<12} --> {}", "Error", self);
                self.to_string()
            }
        };

        let mut body = serde_json::json!({
            "error": message,
            "code": self.code(),
            "retryable": self.is_retryable(),
        });

        match &self {
            AppError::AuctionClosed { closes_at } => {
                body["closes_at"] = serde_json::json!(closes_at);
            }
            AppError::BidTooLow {
                current_highest,
                minimum_bid,
            } => {
                body["current_highest"] = serde_json::json!(current_highest);
                body["minimum_bid"] = serde_json::json!(minimum_bid);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

// endregion: --- App Error

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_errors_map_to_409_with_codes() {
        let err = AppError::BidTooLow {
            current_highest: Some(105),
            minimum_bid: 106,
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "LOW_BID");
        assert!(!err.is_retryable());

        assert_eq!(AppError::SelfBid.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::NotOwner.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn busy_is_the_only_retryable_error() {
        assert!(AppError::Busy.is_retryable());
        assert_eq!(AppError::Busy.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!AppError::Unauthenticated.is_retryable());
    }

    #[test]
    fn storage_failures_are_server_errors() {
        let err = AppError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
    }
}
// endregion: --- Tests
