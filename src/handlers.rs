// region:    --- Imports
use crate::auth::gatekeeper::{require_session, SessionToken};
use crate::auth::service::{self, LoginRequest, RegisterRequest};
use crate::auth::session::{Claims, IssuedSession};
use crate::bidding::commands::{BidReceipt, CreateAuctionCommand, PlaceBidCommand};
use crate::bidding::model::{Account, Auction, Bid, Notification, Settlement};
use crate::error::Result;
use crate::message_broker::EventFilter;
use crate::query;
use crate::query::handlers::AuctionView;
use crate::state::AppState;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Routes
/// 요청 바디 최대 크기
const BODY_LIMIT: usize = 64 * 1024;

pub fn routes(state: AppState) -> Router {
    let auth = middleware::from_fn_with_state(state.clone(), require_session);

    Router::new()
        .route("/accounts", post(handle_register))
        .route("/auth/login", post(handle_login))
        .route(
            "/auth/logout",
            post(handle_logout).route_layer(auth.clone()),
        )
        .route(
            "/auctions",
            get(handle_list_auctions)
                .merge(post(handle_create_auction).route_layer(auth.clone())),
        )
        .route("/auctions/:id", get(handle_get_auction))
        .route(
            "/auctions/:id/bids",
            get(handle_get_auction_bids).merge(post(handle_place_bid).route_layer(auth.clone())),
        )
        .route(
            "/auctions/:id/close",
            post(handle_close_auction).route_layer(auth.clone()),
        )
        .route("/me/bids", get(handle_my_bids).route_layer(auth.clone()))
        .route(
            "/me/notifications",
            get(handle_my_notifications).route_layer(auth.clone()),
        )
        .route(
            "/me/notifications/:id",
            delete(handle_delete_notification).route_layer(auth),
        )
        .route("/events", get(handle_events))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

// endregion: --- Routes

// region:    --- Auth Handlers

/// 계정 등록
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Account>)> {
    info!("{:<12} --> 계정 등록 요청", "Handler");
    let account =
        service::register_account(state.store.as_ref(), state.engine.clock().as_ref(), req)
            .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// 로그인
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<IssuedSession>> {
    info!("{:<12} --> 로그인 요청", "Handler");
    let issued = service::login(
        state.store.as_ref(),
        state.sessions.as_ref(),
        state.session_ttl,
        req,
    )
    .await?;
    Ok(Json(issued))
}

/// 로그아웃
pub async fn handle_logout(
    State(state): State<AppState>,
    Extension(token): Extension<SessionToken>,
) -> Result<StatusCode> {
    info!("{:<12} --> 로그아웃 요청", "Handler");
    service::logout(state.sessions.as_ref(), &token.0).await?;
    Ok(StatusCode::NO_CONTENT)
}

// endregion: --- Auth Handlers

// region:    --- Command Handlers

/// 입찰 요청 바디
#[derive(Debug, Deserialize)]
pub struct BidRequest {
    pub amount: i64,
}

/// 경매 등록
pub async fn handle_create_auction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(cmd): Json<CreateAuctionCommand>,
) -> Result<(StatusCode, Json<Auction>)> {
    let auction = state.engine.create_auction(&claims, cmd).await?;
    Ok((StatusCode::CREATED, Json(auction)))
}

/// 입찰
pub async fn handle_place_bid(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(auction_id): Path<i64>,
    Json(req): Json<BidRequest>,
) -> Result<(StatusCode, Json<BidReceipt>)> {
    let receipt = state
        .engine
        .place_bid(
            &claims,
            PlaceBidCommand {
                auction_id,
                amount: req.amount,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// 판매자 경매 종료
pub async fn handle_close_auction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(auction_id): Path<i64>,
) -> Result<Json<Settlement>> {
    let settlement = state.engine.close_auction(&claims, auction_id).await?;
    Ok(Json(settlement))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// 진행 중인 경매 조회
pub async fn handle_list_auctions(State(state): State<AppState>) -> Result<Json<Vec<Auction>>> {
    let auctions = query::handlers::list_open_auctions(&state.engine).await?;
    Ok(Json(auctions))
}

/// 경매 조회
pub async fn handle_get_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> Result<Json<AuctionView>> {
    let view = query::handlers::get_auction(&state.engine, auction_id).await?;
    Ok(Json(view))
}

/// 경매 입찰 조회
pub async fn handle_get_auction_bids(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> Result<Json<Vec<Bid>>> {
    let bids = query::handlers::list_auction_bids(&state.engine, auction_id).await?;
    Ok(Json(bids))
}

/// 내 입찰 이력
pub async fn handle_my_bids(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Bid>>> {
    let bids = query::handlers::list_my_bid_history(&state.engine, claims.account_id).await?;
    Ok(Json(bids))
}

/// 내 알림
pub async fn handle_my_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Notification>>> {
    let notifications =
        query::handlers::list_notifications(&state.engine, claims.account_id).await?;
    Ok(Json(notifications))
}

/// 내 알림 삭제
pub async fn handle_delete_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(notification_id): Path<i64>,
) -> Result<StatusCode> {
    query::handlers::delete_notification(&state.engine, claims.account_id, notification_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// endregion: --- Query Handlers

// region:    --- Live Events

/// 실시간 이벤트 스트림 (SSE). `auction_id`, `account_id`로 거를 수 있다.
pub async fn handle_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    info!("{:<12} --> 이벤트 구독: {:?}", "Handler", filter);
    let stream = BroadcastStream::new(state.hub.subscribe()).filter_map(move |message| {
        match message {
            Ok(event) if filter.matches(&event) => Event::default()
                .event(event.event_type())
                .json_data(&event)
                .ok()
                .map(Ok),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                // 느린 구독자는 놓친 이벤트를 조회로 복구한다
                warn!("{:<12} --> 구독자 지연, {}건 누락", "Handler", skipped);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// endregion: --- Live Events
