// region:    --- Imports
use anyhow::Context;
use auction_engine::clock::SystemClock;
use auction_engine::config::Config;
use auction_engine::database::DatabaseManager;
use auction_engine::handlers;
use auction_engine::scheduler::AuctionScheduler;
use auction_engine::state::AppState;
use auction_engine::store::{AuctionStore, MemoryStore, PostgresStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일이 있으면 읽는다
    dotenvy::dotenv().ok();

    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::from_env().context("설정 읽기 실패")?;

    // 저장소 선택
    let store: Arc<dyn AuctionStore> = match &config.database_url {
        Some(database_url) => {
            let db_manager = DatabaseManager::connect(database_url, config.database_max_connections)
                .await
                .context("데이터베이스 연결 실패")?;
            if let Err(e) = db_manager.initialize_database().await {
                error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
                return Err(e.into());
            }
            info!("{:<12} --> 데이터베이스 초기화 성공", "Main");
            Arc::new(PostgresStore::new(Arc::new(db_manager)))
        }
        None => {
            warn!(
                "{:<12} --> DATABASE_URL 없음, 메모리 저장소 사용 (재시작 시 데이터 유실)",
                "Main"
            );
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(&config, store, Arc::new(SystemClock))?;

    // 마감 경매 정리 / 만료 세션 삭제
    let scheduler = AuctionScheduler::new(
        Arc::clone(&state.engine),
        Arc::clone(&state.sessions),
        config.sweep_interval,
        config.session_purge_interval,
    );
    scheduler.start();

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes_all = handlers::routes(state).layer(cors);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("{} 바인드 실패", config.bind_addr))?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
