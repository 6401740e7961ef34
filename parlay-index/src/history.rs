use crate::{composite::Index, market::TradeRecord, synthetic::SyntheticPolicy};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Number of points in the synthetic daily series substituted when an index
/// has no real trade history to display.
pub const SYNTHETIC_SERIES_POINTS: usize = 30;

/// One OHLCV bucket produced by [`generate_candles`].
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct CandleData {
    /// Bucket start, epoch seconds.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Merge an index's constituent trade series into one combined series.
///
/// Each constituent contributes the series matching its position side (YES
/// selects the first series, NO the second, falling back to the first when
/// the selected side is absent). Records are tagged with a synthetic
/// `index:<id>` trader and the combined series is sorted ascending by
/// timestamp. An index with no constituents, or whose constituents carry no
/// trades, yields a policy-synthesized daily series instead - callers never
/// receive an empty series for display.
pub fn index_price_history(index: &Index, synthetic: &dyn SyntheticPolicy) -> Vec<TradeRecord> {
    let tag = SmolStr::from(format!("index:{}", index.id));

    let combined: Vec<TradeRecord> = index
        .markets
        .iter()
        .filter_map(|market| {
            market
                .price_history
                .as_ref()
                .map(|history| history.side(market.position))
        })
        .flatten()
        .map(|trade| TradeRecord {
            trader: tag.clone(),
            ..trade.clone()
        })
        .sorted_by_key(|trade| trade.timestamp)
        .collect();

    if combined.is_empty() {
        return synthetic.daily_series(SYNTHETIC_SERIES_POINTS);
    }
    combined
}

/// Bucket a flat trade series into OHLCV candles of `bucket_hours` width.
///
/// The series is sorted by timestamp first; buckets are aligned to the first
/// trade's timestamp and half-open. Only non-empty buckets emit a candle -
/// gaps are omitted, never zero-filled. Zero or one input records yield zero
/// or one candles.
pub fn generate_candles(trades: &[TradeRecord], bucket_hours: f64) -> Vec<CandleData> {
    if trades.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<&TradeRecord> = trades.iter().collect();
    sorted.sort_by_key(|trade| trade.timestamp);

    let bucket_secs = ((bucket_hours * 3600.0) as i64).max(1);
    let first = sorted[0].timestamp;

    let mut candles = Vec::new();
    let mut current: Option<(i64, CandleData)> = None;

    for trade in sorted {
        let bucket = (trade.timestamp - first) / bucket_secs;
        match current.as_mut() {
            Some((open_bucket, candle)) if *open_bucket == bucket => {
                candle.high = candle.high.max(trade.price);
                candle.low = candle.low.min(trade.price);
                candle.close = trade.price;
                candle.volume += trade.volume_base;
            }
            _ => {
                if let Some((_, done)) = current.take() {
                    candles.push(done);
                }
                current = Some((
                    bucket,
                    CandleData {
                        time: first + bucket * bucket_secs,
                        open: trade.price,
                        high: trade.price,
                        low: trade.price,
                        close: trade.price,
                        volume: trade.volume_base,
                    },
                ));
            }
        }
    }
    if let Some((_, done)) = current {
        candles.push(done);
    }
    candles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        composite::Index,
        definitions::{IndexDefinition, IndexStatus},
        market::{Market, PositionSide, PriceHistory},
        provider::ProviderId,
        synthetic::StaticPolicy,
    };

    fn trade(timestamp: i64, price: f64) -> TradeRecord {
        TradeRecord {
            price,
            volume_base: 1.0,
            timestamp,
            trader: SmolStr::new_static("0xfeed"),
        }
    }

    fn constituent(position: PositionSide, history: Option<PriceHistory>) -> Market {
        Market {
            id: SmolStr::new_static("0xabc"),
            provider: ProviderId::Polymarket,
            name: "constituent".to_string(),
            category: "General".to_string(),
            description: String::new(),
            icon: String::new(),
            price: 0.5,
            proportion: 0.5,
            position,
            remaining_hours: 0.0,
            end_time: None,
            volume: 0.0,
            price_history: history,
            order_book: None,
        }
    }

    fn index(markets: Vec<Market>) -> Index {
        let definition = IndexDefinition {
            id: SmolStr::new_static("test-index"),
            name: "Test Index".to_string(),
            provider: ProviderId::Polymarket,
            market_ids: markets.iter().map(|market| market.id.clone()).collect(),
            position_codes: markets.iter().map(|_| 1).collect(),
            contract_address: String::new(),
            status: IndexStatus::Active,
            resolution_time: String::new(),
            confirmed_yield: None,
        };
        Index::assemble(&definition, markets, Default::default())
    }

    #[test]
    fn test_index_history_side_selection_and_merge() {
        // Constituent A holds YES: selects its first series.
        let a = constituent(
            PositionSide::Yes,
            Some(PriceHistory(vec![
                vec![trade(1, 0.5), trade(3, 0.6)],
                vec![],
            ])),
        );
        // Constituent B holds NO: selects its second series only.
        let b = constituent(
            PositionSide::No,
            Some(PriceHistory(vec![vec![trade(2, 0.4)], vec![trade(4, 0.45)]])),
        );

        let combined = index_price_history(&index(vec![a, b]), &StaticPolicy::default());

        let times: Vec<i64> = combined.iter().map(|t| t.timestamp).collect();
        assert_eq!(times, vec![1, 3, 4]);
        assert!((combined[2].price - 0.45).abs() < f64::EPSILON);
        assert!(combined.iter().all(|t| t.trader == "index:test-index"));
    }

    #[test]
    fn test_index_history_sorts_by_timestamp() {
        let a = constituent(
            PositionSide::Yes,
            Some(PriceHistory(vec![vec![trade(9, 0.6), trade(5, 0.5)]])),
        );
        let b = constituent(
            PositionSide::Yes,
            Some(PriceHistory(vec![vec![trade(7, 0.4)]])),
        );

        let combined = index_price_history(&index(vec![a, b]), &StaticPolicy::default());
        let times: Vec<i64> = combined.iter().map(|t| t.timestamp).collect();
        assert_eq!(times, vec![5, 7, 9]);
    }

    #[test]
    fn test_index_history_synthesizes_when_empty() {
        // No constituents at all.
        let combined = index_price_history(&index(vec![]), &StaticPolicy::default());
        assert_eq!(combined.len(), SYNTHETIC_SERIES_POINTS);

        // Constituents present but without any trades.
        let hollow = constituent(PositionSide::Yes, Some(PriceHistory(vec![vec![]])));
        let combined = index_price_history(&index(vec![hollow]), &StaticPolicy::default());
        assert_eq!(combined.len(), SYNTHETIC_SERIES_POINTS);
        assert!(
            combined
                .windows(2)
                .all(|pair| pair[0].timestamp < pair[1].timestamp)
        );
    }

    #[test]
    fn test_candles_bucket_series() {
        // 1 trade per hour over 10 hours, 4h buckets: [0-4) [4-8) [8-12).
        let base = 1_700_000_000;
        let trades: Vec<TradeRecord> = (0..11)
            .map(|hour| trade(base + hour * 3600, 0.40 + hour as f64 * 0.01))
            .collect();

        let candles = generate_candles(&trades, 4.0);
        assert_eq!(candles.len(), 3);

        assert_eq!(candles[0].time, base);
        assert!((candles[0].open - 0.40).abs() < 1e-9);
        assert!((candles[0].close - 0.43).abs() < 1e-9);
        assert!((candles[0].high - 0.43).abs() < 1e-9);
        assert!((candles[0].low - 0.40).abs() < 1e-9);
        assert!((candles[0].volume - 4.0).abs() < 1e-9);

        assert_eq!(candles[1].time, base + 4 * 3600);
        assert!((candles[1].open - 0.44).abs() < 1e-9);
        assert!((candles[1].close - 0.47).abs() < 1e-9);

        assert_eq!(candles[2].time, base + 8 * 3600);
        assert!((candles[2].open - 0.48).abs() < 1e-9);
        assert!((candles[2].close - 0.50).abs() < 1e-9);
        assert!((candles[2].volume - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_candles_unsorted_input() {
        let trades = vec![trade(7200, 0.6), trade(0, 0.5), trade(3600, 0.55)];
        let candles = generate_candles(&trades, 1.0);
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0].time, 0);
        assert!((candles[0].open - 0.5).abs() < f64::EPSILON);
        assert!((candles[2].close - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_candles_degenerate_input() {
        assert!(generate_candles(&[], 4.0).is_empty());

        let single = generate_candles(&[trade(100, 0.37)], 4.0);
        assert_eq!(single.len(), 1);
        let candle = single[0];
        assert_eq!(candle.open, candle.high);
        assert_eq!(candle.high, candle.low);
        assert_eq!(candle.low, candle.close);
        assert!((candle.close - 0.37).abs() < f64::EPSILON);
    }

    #[test]
    fn test_candles_omit_empty_buckets() {
        // Trades at hours 0 and 10 with 1h buckets: only two candles.
        let trades = vec![trade(0, 0.5), trade(10 * 3600, 0.6)];
        let candles = generate_candles(&trades, 1.0);
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time, 0);
        assert_eq!(candles[1].time, 10 * 3600);
    }
}
