use crate::{book::OrderBookSummary, market::PriceHistory};
use async_trait::async_trait;
use derive_more::Display;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

/// Polymarket-style REST [`MarketDataProvider`] implementation.
pub mod gamma;

/// Tolerant deserialization helpers for raw provider payloads.
pub(crate) mod de;

/// Upstream prediction-market platform a market id belongs to.
///
/// Market ids are only unique within one provider namespace, so every
/// per-market lookup carries its [`ProviderId`].
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    #[display("polymarket")]
    Polymarket,
    #[display("kalshi")]
    Kalshi,
}

/// All errors generated while talking to a market-data provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("market not found: {0}")]
    NotFound(SmolStr),

    #[error("provider not served by this client: {0}")]
    UnsupportedProvider(ProviderId),

    #[error("upstream returned HTTP {0}")]
    Http(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed upstream payload: {0}")]
    Parse(String),
}

/// One position token of a raw provider market record.
///
/// Prices arrive as JSON numbers from some endpoints and as numeric strings
/// from others, so deserialization accepts both.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PositionToken {
    pub token_id: SmolStr,
    #[serde(default)]
    pub outcome: String,
    #[serde(default, deserialize_with = "de::flexible_f64")]
    pub price: f64,
}

/// Raw market record as delivered by the provider, prior to normalisation.
///
/// ### Raw Payload Example
/// ```json
/// {
///     "condition_id": "0x178a6a7e5f6ab6e4b6a7dc0a0d573c4ff8d2e5a9c0b1e24d8f6a3b9c7d5e1f02",
///     "question": "Will the Fed cut rates in March?",
///     "description": "Resolves YES if the FOMC lowers the target range.",
///     "icon": "https://example.org/icon.png",
///     "group_item_title": "Economics",
///     "end_date_iso": "2026-03-18T00:00:00Z",
///     "tokens": [
///         { "token_id": "7131", "outcome": "Yes", "price": "0.62" },
///         { "token_id": "7132", "outcome": "No", "price": 0.38 }
///     ]
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExchangeRecord {
    #[serde(alias = "condition_id")]
    pub id: SmolStr,
    #[serde(alias = "question", default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(alias = "group_item_title", default)]
    pub group_title: Option<String>,
    #[serde(alias = "end_date_iso", default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub tokens: Vec<PositionToken>,
}

/// Abstract market-data provider consumed by the
/// [`IndexCompositor`](crate::composite::IndexCompositor).
///
/// Implementations fetch one market's metadata, trade history, or order book
/// by id. Failures propagate - the compositor owns all fallback behaviour.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the raw market record for `market_id`.
    async fn fetch_exchange(
        &self,
        provider: ProviderId,
        market_id: &str,
    ) -> Result<ExchangeRecord, ProviderError>;

    /// Fetch per-position-token trade history for `market_id`.
    async fn fetch_price_history(
        &self,
        provider: ProviderId,
        market_id: &str,
    ) -> Result<PriceHistory, ProviderError>;

    /// Fetch the per-asset order book summaries for `market_id`.
    async fn fetch_order_book(
        &self,
        provider: ProviderId,
        market_id: &str,
    ) -> Result<IndexMap<SmolStr, OrderBookSummary>, ProviderError>;
}
