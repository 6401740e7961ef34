use crate::{
    book::OrderBookSummary,
    composite::Index,
    market::{Market, PriceHistory},
    provider::ProviderId,
};
use fnv::FnvHashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use smol_str::SmolStr;

/// Cache key for the per-market key-spaces. Market ids are only unique
/// within one provider namespace, so the provider is part of the key.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MarketKey {
    pub provider: ProviderId,
    pub market_id: SmolStr,
}

impl MarketKey {
    pub fn new(provider: ProviderId, market_id: impl Into<SmolStr>) -> Self {
        Self {
            provider,
            market_id: market_id.into(),
        }
    }
}

/// Process-lifetime memoization for resolved market data.
///
/// Four independent key-spaces: market snapshots, price histories, and order
/// books by provider + market id, resolved indexes by index id. Lookups are
/// plain map reads; entries are written only by the compositor after a fetch
/// step completes, as one single-step insert - readers never observe a
/// partially built entry. There is no TTL or eviction: entries live until an
/// explicit `clear_*`, so stale data persists until an external refresh
/// clears or bypasses the cache.
///
/// Constructed once at startup and passed to the compositor by reference -
/// never a process-global.
#[derive(Default)]
pub struct IndexCache {
    markets: RwLock<FnvHashMap<MarketKey, Market>>,
    histories: RwLock<FnvHashMap<MarketKey, PriceHistory>>,
    books: RwLock<FnvHashMap<MarketKey, IndexMap<SmolStr, OrderBookSummary>>>,
    indexes: RwLock<FnvHashMap<SmolStr, Index>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn market(&self, key: &MarketKey) -> Option<Market> {
        self.markets.read().get(key).cloned()
    }

    pub fn set_market(&self, key: MarketKey, market: Market) {
        self.markets.write().insert(key, market);
    }

    pub fn history(&self, key: &MarketKey) -> Option<PriceHistory> {
        self.histories.read().get(key).cloned()
    }

    pub fn set_history(&self, key: MarketKey, history: PriceHistory) {
        self.histories.write().insert(key, history);
    }

    pub fn book(&self, key: &MarketKey) -> Option<IndexMap<SmolStr, OrderBookSummary>> {
        self.books.read().get(key).cloned()
    }

    pub fn set_book(&self, key: MarketKey, book: IndexMap<SmolStr, OrderBookSummary>) {
        self.books.write().insert(key, book);
    }

    pub fn index(&self, id: &str) -> Option<Index> {
        self.indexes.read().get(id).cloned()
    }

    pub fn set_index(&self, index: Index) {
        self.indexes.write().insert(index.id.clone(), index);
    }

    pub fn clear_markets(&self) {
        self.markets.write().clear();
    }

    pub fn clear_histories(&self) {
        self.histories.write().clear();
    }

    pub fn clear_books(&self) {
        self.books.write().clear();
    }

    pub fn clear_indexes(&self) {
        self.indexes.write().clear();
    }

    pub fn clear_all(&self) {
        self.clear_markets();
        self.clear_histories();
        self.clear_books();
        self.clear_indexes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::PositionSide;

    fn market(id: &str) -> Market {
        Market {
            id: SmolStr::from(id),
            provider: ProviderId::Polymarket,
            name: String::new(),
            category: String::new(),
            description: String::new(),
            icon: String::new(),
            price: 0.5,
            proportion: 1.0,
            position: PositionSide::Yes,
            remaining_hours: 0.0,
            end_time: None,
            volume: 0.0,
            price_history: None,
            order_book: None,
        }
    }

    #[test]
    fn test_market_keyspace_round_trip() {
        let cache = IndexCache::new();
        let key = MarketKey::new(ProviderId::Polymarket, "0xabc");

        assert!(cache.market(&key).is_none());
        cache.set_market(key.clone(), market("0xabc"));
        assert_eq!(cache.market(&key).unwrap().id, "0xabc");

        // The same market id under another provider namespace is a miss.
        let other = MarketKey::new(ProviderId::Kalshi, "0xabc");
        assert!(cache.market(&other).is_none());
    }

    #[test]
    fn test_keyspaces_are_independent() {
        let cache = IndexCache::new();
        let key = MarketKey::new(ProviderId::Polymarket, "0xabc");

        cache.set_market(key.clone(), market("0xabc"));
        cache.set_history(key.clone(), PriceHistory::default());

        cache.clear_histories();
        assert!(cache.history(&key).is_none());
        assert!(cache.market(&key).is_some());

        cache.clear_all();
        assert!(cache.market(&key).is_none());
    }
}
