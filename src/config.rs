// region:    --- Imports
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

// endregion: --- Imports

// region:    --- Config
/// 서비스 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP 바인드 주소
    pub bind_addr: String,
    /// PostgreSQL 접속 URL. 없으면 메모리 저장소를 사용한다.
    pub database_url: Option<String>,
    /// 커넥션 풀 최대 크기
    pub database_max_connections: u32,
    /// 세션 유효 시간
    pub session_ttl: chrono::Duration,
    /// 마감 경매 정리 주기
    pub sweep_interval: Duration,
    /// 만료 세션 삭제 주기
    pub session_purge_interval: Duration,
    /// 경매별 직렬화 지점 대기 한도
    pub bid_lock_timeout: Duration,
    /// 실시간 이벤트 버퍼 크기
    pub event_buffer: usize,
    /// Kafka 브로커 목록 (kafka feature)
    pub kafka_brokers: Option<String>,
    /// Kafka 토픽
    pub kafka_topic: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: None,
            database_max_connections: 5,
            session_ttl: chrono::Duration::hours(24),
            sweep_interval: Duration::from_millis(1000),
            session_purge_interval: Duration::from_secs(3600),
            bid_lock_timeout: Duration::from_millis(2000),
            event_buffer: 1024,
            kafka_brokers: None,
            kafka_topic: "auction-events".to_string(),
        }
    }
}

impl Config {
    /// 환경 변수에서 설정을 읽는다. 없는 값은 기본값을 쓴다.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let session_ttl_hours: i64 = parse_var("SESSION_TTL_HOURS", 24)?;
        if session_ttl_hours <= 0 {
            anyhow::bail!("SESSION_TTL_HOURS must be positive");
        }

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            database_max_connections: parse_var(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            session_ttl: chrono::Duration::hours(session_ttl_hours),
            sweep_interval: Duration::from_millis(parse_var("SWEEP_INTERVAL_MS", 1000)?),
            session_purge_interval: Duration::from_secs(parse_var(
                "SESSION_PURGE_INTERVAL_SECS",
                3600,
            )?),
            bid_lock_timeout: Duration::from_millis(parse_var("BID_LOCK_TIMEOUT_MS", 2000)?),
            event_buffer: parse_var("EVENT_BUFFER", defaults.event_buffer)?,
            kafka_brokers: env::var("KAFKA_BROKERS").ok().filter(|b| !b.is_empty()),
            kafka_topic: env::var("KAFKA_TOPIC").unwrap_or(defaults.kafka_topic),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

// endregion: --- Config
