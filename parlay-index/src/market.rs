use crate::{
    book::OrderBookSummary,
    provider::{ExchangeRecord, ProviderId},
};
use chrono::{DateTime, Utc};
use derive_more::Display;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::warn;

/// Category assigned to markets whose provider record carries no group title.
pub const DEFAULT_CATEGORY: &str = "General";

/// Side of a binary prediction market a constituent holds.
///
/// Index definitions encode the side as an integer per slot: `1` is YES,
/// anything else is NO. `Unknown` only appears on freshly built snapshots
/// whose provider outcome label was unrecognised - the compositor overwrites
/// it from the slot's position code before the market is ever aggregated.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
pub enum PositionSide {
    #[display("YES")]
    #[serde(rename = "YES")]
    Yes,
    #[display("NO")]
    #[serde(rename = "NO")]
    No,
    Unknown,
}

impl PositionSide {
    /// Derive the side from an index definition's per-slot position code.
    pub fn from_code(code: i64) -> Self {
        if code == 1 { Self::Yes } else { Self::No }
    }

    /// Parse a provider outcome label, case-insensitively.
    pub fn from_outcome(outcome: &str) -> Self {
        match outcome.trim().to_ascii_lowercase().as_str() {
            "yes" => Self::Yes,
            "no" => Self::No,
            _ => Self::Unknown,
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Self::Yes)
    }
}

/// One executed trade from a market's history feed.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TradeRecord {
    pub price: f64,
    pub volume_base: f64,
    /// Execution time, epoch seconds.
    pub timestamp: i64,
    pub trader: SmolStr,
}

/// Trade history for one market: one series per position token, in provider
/// order (YES side first for binary markets).
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct PriceHistory(pub Vec<Vec<TradeRecord>>);

impl PriceHistory {
    /// The market's primary series (first position token), if any.
    pub fn primary(&self) -> Option<&[TradeRecord]> {
        self.0.first().map(Vec::as_slice)
    }

    /// The series matching `side`: YES selects the first series, NO the
    /// second, falling back to the first when the selected one is absent.
    pub fn side(&self, side: PositionSide) -> &[TradeRecord] {
        let selected = if side.is_yes() { 0 } else { 1 };
        self.0
            .get(selected)
            .or_else(|| self.0.first())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Traded volume: sum of `volume_base` over the primary series.
    pub fn traded_volume(&self) -> f64 {
        self.primary()
            .map(|series| series.iter().map(|trade| trade.volume_base).sum())
            .unwrap_or(0.0)
    }
}

/// Normalised snapshot of one prediction market, as held by an index slot.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Market {
    pub id: SmolStr,
    pub provider: ProviderId,
    pub name: String,
    pub category: String,
    pub description: String,
    pub icon: String,
    /// Average price across the market's position tokens at fetch time.
    /// Nominally a probability in `[0, 1]`, but never clamped.
    pub price: f64,
    /// Weight of this market within its parent index, `1/constituent_count`.
    pub proportion: f64,
    pub position: PositionSide,
    /// Hours until the market's end date, floored at zero.
    pub remaining_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Traded volume of the primary series; zero until history is fetched.
    pub volume: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_history: Option<PriceHistory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_book: Option<IndexMap<SmolStr, OrderBookSummary>>,
}

impl Market {
    /// Build a normalised snapshot from a raw provider record.
    ///
    /// Total: display metadata defaults to empty strings, the price of a
    /// record with no position tokens is `0`, and an unparseable end date
    /// yields `remaining_hours == 0` with a warning rather than an error.
    /// The caller owns `proportion` and `position` - both are placeholders
    /// until the compositor assigns the slot's weight and side.
    pub fn from_record(provider: ProviderId, record: &ExchangeRecord) -> Self {
        let price = if record.tokens.is_empty() {
            0.0
        } else {
            record.tokens.iter().map(|token| token.price).sum::<f64>()
                / record.tokens.len() as f64
        };

        let end_time = record.end_date.as_deref().and_then(|raw| {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(end) => Some(end.with_timezone(&Utc)),
                Err(error) => {
                    warn!(market = %record.id, %error, "unparseable market end date");
                    None
                }
            }
        });
        let remaining_hours = end_time
            .map(|end| ((end - Utc::now()).num_milliseconds() as f64 / 3_600_000.0).max(0.0))
            .unwrap_or(0.0);

        Self {
            id: record.id.clone(),
            provider,
            name: record.title.clone(),
            category: record
                .group_title
                .clone()
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            description: record.description.clone(),
            icon: record.icon.clone(),
            price,
            proportion: 1.0,
            position: record
                .tokens
                .first()
                .map(|token| PositionSide::from_outcome(&token.outcome))
                .unwrap_or(PositionSide::Unknown),
            remaining_hours,
            end_time,
            volume: 0.0,
            price_history: None,
            order_book: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PositionToken;

    fn record(tokens: Vec<PositionToken>, end_date: Option<&str>) -> ExchangeRecord {
        ExchangeRecord {
            id: SmolStr::new_static("0xabc"),
            title: "Will it happen?".to_string(),
            description: String::new(),
            icon: String::new(),
            group_title: None,
            end_date: end_date.map(str::to_string),
            tokens,
        }
    }

    fn token(outcome: &str, price: f64) -> PositionToken {
        PositionToken {
            token_id: SmolStr::new_static("t"),
            outcome: outcome.to_string(),
            price,
        }
    }

    #[test]
    fn test_position_side_from_code() {
        assert_eq!(PositionSide::from_code(1), PositionSide::Yes);
        assert_eq!(PositionSide::from_code(2), PositionSide::No);
        assert_eq!(PositionSide::from_code(0), PositionSide::No);
        assert_eq!(PositionSide::from_code(-1), PositionSide::No);
    }

    #[test]
    fn test_position_side_from_outcome() {
        assert_eq!(PositionSide::from_outcome("Yes"), PositionSide::Yes);
        assert_eq!(PositionSide::from_outcome("NO"), PositionSide::No);
        assert_eq!(PositionSide::from_outcome(" yes "), PositionSide::Yes);
        assert_eq!(PositionSide::from_outcome("Maybe"), PositionSide::Unknown);
    }

    #[test]
    fn test_snapshot_price_is_token_mean() {
        let market = Market::from_record(
            ProviderId::Polymarket,
            &record(vec![token("Yes", 0.62), token("No", 0.38)], None),
        );
        assert!((market.price - 0.5).abs() < f64::EPSILON);
        assert_eq!(market.position, PositionSide::Yes);
        assert_eq!(market.proportion, 1.0);
    }

    #[test]
    fn test_snapshot_without_tokens() {
        let market = Market::from_record(ProviderId::Polymarket, &record(vec![], None));
        assert_eq!(market.price, 0.0);
        assert_eq!(market.position, PositionSide::Unknown);
    }

    #[test]
    fn test_snapshot_category_defaults() {
        let mut raw = record(vec![], None);
        raw.group_title = Some(String::new());
        let market = Market::from_record(ProviderId::Polymarket, &raw);
        assert_eq!(market.category, DEFAULT_CATEGORY);

        raw.group_title = Some("Economics".to_string());
        let market = Market::from_record(ProviderId::Polymarket, &raw);
        assert_eq!(market.category, "Economics");
    }

    #[test]
    fn test_snapshot_remaining_hours() {
        // Unparseable end date is tolerated with a zero default.
        let market = Market::from_record(
            ProviderId::Polymarket,
            &record(vec![], Some("tomorrow-ish")),
        );
        assert_eq!(market.remaining_hours, 0.0);
        assert!(market.end_time.is_none());

        // A past end date floors at zero rather than going negative.
        let market = Market::from_record(
            ProviderId::Polymarket,
            &record(vec![], Some("2001-01-01T00:00:00Z")),
        );
        assert_eq!(market.remaining_hours, 0.0);
        assert!(market.end_time.is_some());

        // A future end date yields a positive hour count.
        let future = (Utc::now() + chrono::Duration::hours(48)).to_rfc3339();
        let market = Market::from_record(ProviderId::Polymarket, &record(vec![], Some(&future)));
        assert!(market.remaining_hours > 47.0 && market.remaining_hours <= 48.0);
    }

    #[test]
    fn test_history_side_selection() {
        let trade = |timestamp: i64, price: f64| TradeRecord {
            price,
            volume_base: 1.0,
            timestamp,
            trader: SmolStr::new_static("0xfeed"),
        };
        let history = PriceHistory(vec![vec![trade(1, 0.5)], vec![trade(2, 0.4)]]);

        assert_eq!(history.side(PositionSide::Yes)[0].timestamp, 1);
        assert_eq!(history.side(PositionSide::No)[0].timestamp, 2);

        // NO falls back to the primary series when only one side exists.
        let single = PriceHistory(vec![vec![trade(1, 0.5)]]);
        assert_eq!(single.side(PositionSide::No)[0].timestamp, 1);

        let empty = PriceHistory::default();
        assert!(empty.side(PositionSide::Yes).is_empty());
    }

    #[test]
    fn test_traded_volume_sums_primary_series() {
        let trade = |volume_base: f64| TradeRecord {
            price: 0.5,
            volume_base,
            timestamp: 0,
            trader: SmolStr::new_static("0xfeed"),
        };
        let history = PriceHistory(vec![vec![trade(10.0), trade(32.5)], vec![trade(999.0)]]);
        assert!((history.traded_volume() - 42.5).abs() < f64::EPSILON);
        assert_eq!(PriceHistory::default().traded_volume(), 0.0);
    }
}
