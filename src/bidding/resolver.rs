use super::model::Bid;

/// 낙찰 입찰 선택
///
/// 금액이 가장 큰 입찰이 이긴다. 같은 금액이면 먼저 들어온 입찰(`placed_at`이 이른 쪽),
/// 그것도 같으면 id가 작은 쪽이 이긴다. 입찰이 없으면 `None`.
pub fn resolve_winner(bids: &[Bid]) -> Option<&Bid> {
    bids.iter().min_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then(a.placed_at.cmp(&b.placed_at))
            .then(a.id.cmp(&b.id))
    })
}
