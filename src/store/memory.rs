// region:    --- Imports
use super::AuctionStore;
use crate::auth::session::SessionRecord;
use crate::bidding::model::{
    Account, Auction, AuctionState, Bid, NewAccount, NewAuction, NewBid, Notification,
    Settlement, WinnerRecord,
};
use crate::bidding::resolver::resolve_winner;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

// endregion: --- Imports

// region:    --- Memory Store
#[derive(Default)]
struct Tables {
    accounts: HashMap<i64, Account>,
    emails: HashMap<String, i64>,
    sessions: HashMap<String, SessionRecord>,
    auctions: BTreeMap<i64, Auction>,
    bids: BTreeMap<i64, Vec<Bid>>,
    winners: HashMap<i64, WinnerRecord>,
    notifications: BTreeMap<i64, Notification>,
}

/// 프로세스 메모리 저장소. DATABASE_URL이 없을 때와 테스트에서 사용한다.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| AppError::Internal("memory store poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| AppError::Internal("memory store poisoned".to_string()))
    }
}

#[async_trait]
impl AuctionStore for MemoryStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account> {
        let mut tables = self.write()?;
        if tables.emails.contains_key(&account.email) {
            return Err(AppError::EmailTaken);
        }
        let row = Account {
            id: self.next_id(),
            email: account.email,
            password_hash: account.password_hash,
            can_sell: account.roles.can_sell,
            can_buy: account.roles.can_buy,
            created_at: account.created_at,
        };
        tables.emails.insert(row.email.clone(), row.id);
        tables.accounts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let tables = self.read()?;
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn insert_session(&self, session: &SessionRecord) -> Result<()> {
        let mut tables = self.write()?;
        tables
            .sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>> {
        Ok(self.read()?.sessions.get(token_hash).cloned())
    }

    async fn expire_session(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool> {
        let mut tables = self.write()?;
        match tables.sessions.get_mut(token_hash) {
            Some(session) if session.expires_at > at => {
                session.expires_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_sessions(&self, before: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.write()?;
        let count = tables.sessions.len();
        tables.sessions.retain(|_, s| s.expires_at >= before);
        Ok((count - tables.sessions.len()) as u64)
    }

    async fn insert_auction(&self, auction: NewAuction) -> Result<Auction> {
        let row = Auction {
            id: self.next_id(),
            owner_id: auction.owner_id,
            title: auction.title,
            description: auction.description,
            base_price: auction.base_price,
            highest_bid: None,
            closes_at: auction.closes_at,
            state: AuctionState::Open,
            closed_at: None,
            created_at: auction.created_at,
        };
        let mut tables = self.write()?;
        tables.auctions.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_auction(&self, auction_id: i64) -> Result<Option<Auction>> {
        Ok(self.read()?.auctions.get(&auction_id).cloned())
    }

    async fn list_open_auctions(&self) -> Result<Vec<Auction>> {
        let tables = self.read()?;
        let mut open: Vec<Auction> = tables
            .auctions
            .values()
            .filter(|a| a.state == AuctionState::Open)
            .cloned()
            .collect();
        open.sort_by(|a, b| a.closes_at.cmp(&b.closes_at).then(a.id.cmp(&b.id)));
        Ok(open)
    }

    async fn due_auction_ids(&self, now: DateTime<Utc>) -> Result<Vec<i64>> {
        Ok(self
            .read()?
            .auctions
            .values()
            .filter(|a| a.is_due(now))
            .map(|a| a.id)
            .collect())
    }

    async fn append_bid(&self, bid: NewBid) -> Result<Option<Bid>> {
        let mut tables = self.write()?;
        let Some(auction) = tables.auctions.get_mut(&bid.auction_id) else {
            return Ok(None);
        };
        if !auction.is_open_at(bid.placed_at) || !auction.accepts_amount(bid.amount) {
            return Ok(None);
        }
        auction.highest_bid = Some(bid.amount);

        let row = Bid {
            id: self.next_id(),
            auction_id: bid.auction_id,
            bidder_id: bid.bidder_id,
            amount: bid.amount,
            placed_at: bid.placed_at,
        };
        tables
            .bids
            .entry(row.auction_id)
            .or_default()
            .push(row.clone());
        Ok(Some(row))
    }

    async fn list_bids(&self, auction_id: i64) -> Result<Vec<Bid>> {
        Ok(self
            .read()?
            .bids
            .get(&auction_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_bids_involving(&self, account_id: i64) -> Result<Vec<Bid>> {
        let tables = self.read()?;
        let mut bids: Vec<Bid> = tables
            .bids
            .iter()
            .flat_map(|(auction_id, bids)| {
                let owned = tables
                    .auctions
                    .get(auction_id)
                    .is_some_and(|a| a.owner_id == account_id);
                bids.iter()
                    .filter(move |b| owned || b.bidder_id == account_id)
                    .cloned()
            })
            .collect();
        bids.sort_by(|a, b| b.placed_at.cmp(&a.placed_at).then(b.id.cmp(&a.id)));
        Ok(bids)
    }

    async fn close_and_settle(
        &self,
        auction_id: i64,
        closed_at: DateTime<Utc>,
    ) -> Result<Option<Settlement>> {
        let mut guard = self.write()?;
        let tables = &mut *guard;
        let Some(auction) = tables.auctions.get_mut(&auction_id) else {
            return Err(AppError::NotFound("경매"));
        };
        if auction.state == AuctionState::Closed {
            return Ok(None);
        }
        auction.state = AuctionState::Closed;
        auction.closed_at = Some(closed_at);

        // 쓰기 잠금 안에서 입찰을 읽으므로 종료 직전 입찰도 빠지지 않는다
        let winner = tables
            .bids
            .get(&auction_id)
            .and_then(|bids| resolve_winner(bids))
            .map(|bid| WinnerRecord::from_bid(bid, closed_at));

        if let Some(winner) = &winner {
            tables.winners.insert(auction_id, winner.clone());
            let notification = Notification {
                id: self.next_id(),
                account_id: winner.winner_id,
                auction_id,
                amount: winner.amount,
                created_at: winner.decided_at,
            };
            tables.notifications.insert(notification.id, notification);
        }
        Ok(Some(Settlement { auction_id, winner }))
    }

    async fn find_winner(&self, auction_id: i64) -> Result<Option<WinnerRecord>> {
        Ok(self.read()?.winners.get(&auction_id).cloned())
    }

    async fn list_notifications(&self, account_id: i64) -> Result<Vec<Notification>> {
        let tables = self.read()?;
        Ok(tables
            .notifications
            .values()
            .rev()
            .filter(|n| n.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn delete_notification(&self, notification_id: i64, account_id: i64) -> Result<bool> {
        let mut tables = self.write()?;
        match tables.notifications.get(&notification_id) {
            Some(n) if n.account_id == account_id => {
                tables.notifications.remove(&notification_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// endregion: --- Memory Store

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::model::Roles;
    use chrono::Duration;

    async fn seed_auction(store: &MemoryStore, base_price: i64) -> Auction {
        let now = Utc::now();
        store
            .insert_auction(NewAuction {
                owner_id: 1,
                title: "카메라".to_string(),
                description: String::new(),
                base_price,
                closes_at: now + Duration::minutes(10),
                created_at: now,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        let account = NewAccount {
            email: "a@example.com".to_string(),
            password_hash: "h".to_string(),
            roles: Roles::default(),
            created_at: Utc::now(),
        };
        store.insert_account(account.clone()).await.unwrap();
        let err = store.insert_account(account).await.unwrap_err();
        assert!(matches!(err, AppError::EmailTaken));
    }

    #[tokio::test]
    async fn append_bid_keeps_highest_in_step_with_bids() {
        let store = MemoryStore::new();
        let auction = seed_auction(&store, 100).await;
        let now = Utc::now();
        let bid = |amount| NewBid {
            auction_id: auction.id,
            bidder_id: 2,
            amount,
            placed_at: now,
        };

        assert!(store.append_bid(bid(100)).await.unwrap().is_some());
        // 같은 금액은 최고가를 넘지 못함
        assert!(store.append_bid(bid(100)).await.unwrap().is_none());
        assert!(store.append_bid(bid(120)).await.unwrap().is_some());

        let stored = store.find_auction(auction.id).await.unwrap().unwrap();
        let bids = store.list_bids(auction.id).await.unwrap();
        assert_eq!(stored.highest_bid, bids.iter().map(|b| b.amount).max());
        assert_eq!(stored.highest_bid, Some(120));
    }

    #[tokio::test]
    async fn close_and_settle_runs_once_and_picks_highest_bid() {
        let store = MemoryStore::new();
        let auction = seed_auction(&store, 10).await;
        let now = Utc::now();
        for (bidder_id, amount) in [(7, 10), (8, 25)] {
            store
                .append_bid(NewBid {
                    auction_id: auction.id,
                    bidder_id,
                    amount,
                    placed_at: now,
                })
                .await
                .unwrap();
        }

        let settlement = store
            .close_and_settle(auction.id, Utc::now())
            .await
            .unwrap()
            .unwrap();
        let winner = settlement.winner.unwrap();
        assert_eq!((winner.winner_id, winner.amount), (8, 25));
        assert!(store
            .close_and_settle(auction.id, Utc::now())
            .await
            .unwrap()
            .is_none());

        assert_eq!(store.list_notifications(8).await.unwrap().len(), 1);
        assert!(store.list_notifications(7).await.unwrap().is_empty());
        assert_eq!(store.find_winner(auction.id).await.unwrap(), Some(winner));
    }

    #[tokio::test]
    async fn closed_auction_refuses_late_bids() {
        let store = MemoryStore::new();
        let auction = seed_auction(&store, 10).await;
        store
            .close_and_settle(auction.id, Utc::now())
            .await
            .unwrap();

        let late = NewBid {
            auction_id: auction.id,
            bidder_id: 2,
            amount: 500,
            placed_at: Utc::now(),
        };
        assert!(store.append_bid(late).await.unwrap().is_none());
        assert!(store.find_winner(auction.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn notifications_are_deleted_only_by_owner() {
        let store = MemoryStore::new();
        let auction = seed_auction(&store, 10).await;
        store
            .append_bid(NewBid {
                auction_id: auction.id,
                bidder_id: 7,
                amount: 10,
                placed_at: Utc::now(),
            })
            .await
            .unwrap();
        store
            .close_and_settle(auction.id, Utc::now())
            .await
            .unwrap();
        let id = store.list_notifications(7).await.unwrap()[0].id;

        assert!(!store.delete_notification(id, 8).await.unwrap());
        assert!(store.delete_notification(id, 7).await.unwrap());
        assert!(store.list_notifications(7).await.unwrap().is_empty());
    }
}
// endregion: --- Tests
