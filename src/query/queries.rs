// region:    --- Accounts
/// 계정 생성
pub const INSERT_ACCOUNT: &str = r#"
    INSERT INTO accounts (email, password_hash, can_sell, can_buy, created_at)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id, email, password_hash, can_sell, can_buy, created_at
"#;

/// 이메일로 계정 조회
pub const GET_ACCOUNT_BY_EMAIL: &str =
    "SELECT id, email, password_hash, can_sell, can_buy, created_at FROM accounts WHERE email = $1";

// endregion: --- Accounts

// region:    --- Sessions
pub const INSERT_SESSION: &str = r#"
    INSERT INTO sessions (token_hash, account_id, can_sell, can_buy, issued_at, expires_at)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

pub const GET_SESSION: &str = "SELECT token_hash, account_id, can_sell, can_buy, issued_at, expires_at FROM sessions WHERE token_hash = $1";

/// 살아 있는 세션만 만료 처리
pub const EXPIRE_SESSION: &str =
    "UPDATE sessions SET expires_at = $2 WHERE token_hash = $1 AND expires_at > $2";

pub const PURGE_SESSIONS: &str = "DELETE FROM sessions WHERE expires_at < $1";

// endregion: --- Sessions

// region:    --- Auctions
/// 경매 생성
pub const INSERT_AUCTION: &str = r#"
    INSERT INTO auctions (owner_id, title, description, base_price, closes_at, created_at)
    VALUES ($1, $2, $3, $4, $5, $6)
    RETURNING id, owner_id, title, description, base_price, highest_bid, closes_at, state, closed_at, created_at
"#;

/// 경매 조회
pub const GET_AUCTION: &str = "SELECT id, owner_id, title, description, base_price, highest_bid, closes_at, state, closed_at, created_at FROM auctions WHERE id = $1";

/// 진행 중인 경매 조회
pub const GET_OPEN_AUCTIONS: &str = "SELECT id, owner_id, title, description, base_price, highest_bid, closes_at, state, closed_at, created_at FROM auctions WHERE state = 'OPEN' ORDER BY closes_at, id";

/// 마감 시각이 지난 OPEN 경매
pub const GET_DUE_AUCTION_IDS: &str =
    "SELECT id FROM auctions WHERE state = 'OPEN' AND closes_at <= $1 ORDER BY closes_at, id";

/// 최고가 갱신 (비교 후 교체). 갱신된 행이 없으면 입찰 불가
pub const RAISE_HIGHEST_BID: &str = r#"
    UPDATE auctions SET highest_bid = $2
    WHERE id = $1
      AND state = $4
      AND closes_at > $3
      AND ((highest_bid IS NULL AND $2 >= base_price) OR highest_bid < $2)
"#;

/// 경매 종료 ($4 상태인 경우만). 행 잠금을 잡아 이후 최고가 갱신을 막는다
pub const CLOSE_AUCTION: &str =
    "UPDATE auctions SET state = $3, closed_at = $2 WHERE id = $1 AND state = $4";

// endregion: --- Auctions

// region:    --- Bids
pub const INSERT_BID: &str = r#"
    INSERT INTO bids (auction_id, bidder_id, amount, placed_at)
    VALUES ($1, $2, $3, $4)
    RETURNING id, auction_id, bidder_id, amount, placed_at
"#;

/// 경매 입찰 조회
pub const GET_AUCTION_BIDS: &str = r#"
    SELECT id, auction_id, bidder_id, amount, placed_at
    FROM bids
    WHERE auction_id = $1
    ORDER BY placed_at, id
"#;

/// 내가 입찰했거나 내 경매에 들어온 입찰
pub const GET_BIDS_INVOLVING: &str = r#"
    SELECT b.id, b.auction_id, b.bidder_id, b.amount, b.placed_at
    FROM bids b
    JOIN auctions a ON a.id = b.auction_id
    WHERE b.bidder_id = $1 OR a.owner_id = $1
    ORDER BY b.placed_at DESC, b.id DESC
"#;

// endregion: --- Bids

// region:    --- Settlement
pub const INSERT_WINNER: &str = r#"
    INSERT INTO winners (auction_id, winner_id, bid_id, amount, decided_at)
    VALUES ($1, $2, $3, $4, $5)
"#;

pub const GET_WINNER: &str = "SELECT auction_id, winner_id, bid_id, amount, decided_at FROM winners WHERE auction_id = $1";

pub const INSERT_NOTIFICATION: &str = r#"
    INSERT INTO notifications (account_id, auction_id, amount, created_at)
    VALUES ($1, $2, $3, $4)
"#;

pub const GET_NOTIFICATIONS: &str = r#"
    SELECT id, account_id, auction_id, amount, created_at
    FROM notifications
    WHERE account_id = $1
    ORDER BY id DESC
"#;

/// 소유자의 알림만 삭제
pub const DELETE_NOTIFICATION: &str =
    "DELETE FROM notifications WHERE id = $1 AND account_id = $2";

// endregion: --- Settlement
