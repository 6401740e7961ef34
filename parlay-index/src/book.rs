use crate::composite::Index;
use chrono::Utc;
use derive_more::Constructor;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// One price level of an order book side.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Constructor, Deserialize, Serialize)]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
}

/// Order book summary for one asset id.
///
/// After aggregation `bids` is sorted descending and `asks` ascending by
/// price.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct OrderBookSummary {
    pub market: String,
    pub asset_id: SmolStr,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    pub hash: String,
}

impl OrderBookSummary {
    /// Empty-sided entry carrying only identity metadata, as created by
    /// [`aggregate_order_books`] the first time an asset id is seen.
    pub fn placeholder(market: impl Into<String>, asset_id: SmolStr, timestamp: i64) -> Self {
        Self {
            market: market.into(),
            asset_id,
            timestamp,
            bids: Vec::new(),
            asks: Vec::new(),
            hash: String::new(),
        }
    }

    /// Sort `bids` descending and `asks` ascending by price.
    pub fn sort_sides(&mut self) {
        self.bids.sort_by(|a, b| b.price.total_cmp(&a.price));
        self.asks.sort_by(|a, b| a.price.total_cmp(&b.price));
    }
}

/// Merge the order books of an index's constituents into one per-asset map.
///
/// Every asset id appearing in any constituent's book gets exactly one entry,
/// created first-seen with the index's name, the aggregation timestamp, and
/// empty sides. Bid/ask contents are NOT unioned across constituents sharing
/// an asset id - downstream consumers depend on this exact shape, so it is
/// preserved as observed. Constituents with no order book contribute nothing.
pub fn aggregate_order_books(index: &Index) -> IndexMap<SmolStr, OrderBookSummary> {
    let timestamp = Utc::now().timestamp_millis();
    let mut aggregated = IndexMap::new();

    for market in &index.markets {
        let Some(book) = market.order_book.as_ref() else {
            continue;
        };
        for asset_id in book.keys() {
            aggregated.entry(asset_id.clone()).or_insert_with(|| {
                OrderBookSummary::placeholder(index.name.clone(), asset_id.clone(), timestamp)
            });
        }
    }

    for summary in aggregated.values_mut() {
        summary.sort_sides();
    }
    aggregated
}
