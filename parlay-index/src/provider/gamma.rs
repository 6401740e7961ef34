use super::{ExchangeRecord, MarketDataProvider, ProviderError, ProviderId, de};
use crate::{
    book::{BookLevel, OrderBookSummary},
    market::{PriceHistory, TradeRecord},
};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, de::DeserializeOwned};
use smol_str::SmolStr;
use tracing::debug;
use url::Url;

/// Default Polymarket-style REST base url.
pub const BASE_URL_GAMMA: &str = "https://clob.polymarket.com";

/// REST client for a Polymarket-style market-data API.
///
/// Serves exactly one provider namespace; lookups for any other
/// [`ProviderId`] fail with [`ProviderError::UnsupportedProvider`] rather
/// than being routed to the wrong host.
#[derive(Clone, Debug)]
pub struct GammaClient {
    http: reqwest::Client,
    base_url: Url,
    provider: ProviderId,
}

impl GammaClient {
    /// Client against the default Polymarket endpoint.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(BASE_URL_GAMMA)
    }

    /// Client against a custom endpoint (staging, local fixture server).
    pub fn with_base_url(base_url: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(base_url).map_err(|error| ProviderError::Parse(error.to_string()))?,
            provider: ProviderId::Polymarket,
        })
    }

    fn endpoint(&self, market_id: &str, tail: Option<&str>) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ProviderError::Parse("base url cannot be a base".to_string()))?;
            segments.extend(["markets", market_id]);
            if let Some(tail) = tail {
                segments.push(tail);
            }
        }
        Ok(url)
    }

    fn check_provider(&self, provider: ProviderId) -> Result<(), ProviderError> {
        if provider != self.provider {
            return Err(ProviderError::UnsupportedProvider(provider));
        }
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        market_id: &str,
    ) -> Result<T, ProviderError> {
        debug!(%url, "provider request");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|error| ProviderError::Network(error.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(SmolStr::from(market_id)));
        }
        if let Err(error) = response.error_for_status_ref() {
            return Err(ProviderError::Http(
                error.status().map(|status| status.as_u16()).unwrap_or(0),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|error| ProviderError::Parse(error.to_string()))
    }
}

/// One raw trade point from the history endpoint.
///
/// ### Raw Payload Example
/// ```json
/// { "p": "0.62", "s": "150.5", "t": 1737936000, "taker": "0x9a4f..." }
/// ```
#[derive(Clone, Debug, Deserialize)]
struct RawTrade {
    #[serde(alias = "p", deserialize_with = "de::flexible_f64")]
    price: f64,
    #[serde(alias = "s", deserialize_with = "de::flexible_f64")]
    size: f64,
    #[serde(alias = "t", deserialize_with = "de::flexible_i64")]
    timestamp: i64,
    #[serde(alias = "taker", default)]
    trader: SmolStr,
}

impl From<RawTrade> for TradeRecord {
    fn from(raw: RawTrade) -> Self {
        Self {
            price: raw.price,
            volume_base: raw.size,
            timestamp: raw.timestamp,
            trader: raw.trader,
        }
    }
}

/// Raw order book snapshot for one asset id.
#[derive(Clone, Debug, Deserialize)]
struct RawBook {
    #[serde(default)]
    market: String,
    asset_id: SmolStr,
    #[serde(default, deserialize_with = "de::flexible_i64")]
    timestamp: i64,
    #[serde(default)]
    bids: Vec<RawLevel>,
    #[serde(default)]
    asks: Vec<RawLevel>,
    #[serde(default)]
    hash: String,
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct RawLevel {
    #[serde(deserialize_with = "de::flexible_f64")]
    price: f64,
    #[serde(deserialize_with = "de::flexible_f64")]
    size: f64,
}

impl From<RawBook> for OrderBookSummary {
    fn from(raw: RawBook) -> Self {
        Self {
            market: raw.market,
            asset_id: raw.asset_id,
            timestamp: raw.timestamp,
            bids: raw
                .bids
                .into_iter()
                .map(|level| BookLevel::new(level.price, level.size))
                .collect(),
            asks: raw
                .asks
                .into_iter()
                .map(|level| BookLevel::new(level.price, level.size))
                .collect(),
            hash: raw.hash,
        }
    }
}

#[async_trait]
impl MarketDataProvider for GammaClient {
    async fn fetch_exchange(
        &self,
        provider: ProviderId,
        market_id: &str,
    ) -> Result<ExchangeRecord, ProviderError> {
        self.check_provider(provider)?;
        let url = self.endpoint(market_id, None)?;
        self.get_json(url, market_id).await
    }

    async fn fetch_price_history(
        &self,
        provider: ProviderId,
        market_id: &str,
    ) -> Result<PriceHistory, ProviderError> {
        self.check_provider(provider)?;
        let url = self.endpoint(market_id, Some("price-history"))?;
        let raw: Vec<Vec<RawTrade>> = self.get_json(url, market_id).await?;
        Ok(PriceHistory(
            raw.into_iter()
                .map(|series| series.into_iter().map(TradeRecord::from).collect())
                .collect(),
        ))
    }

    async fn fetch_order_book(
        &self,
        provider: ProviderId,
        market_id: &str,
    ) -> Result<IndexMap<SmolStr, OrderBookSummary>, ProviderError> {
        self.check_provider(provider)?;
        let url = self.endpoint(market_id, Some("book"))?;
        let raw: IndexMap<SmolStr, RawBook> = self.get_json(url, market_id).await?;
        Ok(raw
            .into_iter()
            .map(|(asset_id, book)| (asset_id, OrderBookSummary::from(book)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        let client = GammaClient::with_base_url("https://example.org/api").unwrap();

        let url = client.endpoint("0xabc", None).unwrap();
        assert_eq!(url.as_str(), "https://example.org/api/markets/0xabc");

        let url = client.endpoint("0xabc", Some("book")).unwrap();
        assert_eq!(url.as_str(), "https://example.org/api/markets/0xabc/book");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            GammaClient::with_base_url("not a url"),
            Err(ProviderError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_foreign_provider() {
        let client = GammaClient::with_base_url("https://example.org").unwrap();
        let error = client
            .fetch_exchange(ProviderId::Kalshi, "0xabc")
            .await
            .unwrap_err();
        assert_eq!(
            error,
            ProviderError::UnsupportedProvider(ProviderId::Kalshi)
        );
    }

    #[test]
    fn test_raw_trade_maps_to_record() {
        let raw: RawTrade =
            serde_json::from_str(r#"{ "p": "0.62", "s": 150.5, "t": "1737936000", "taker": "0x9a" }"#)
                .unwrap();
        let record = TradeRecord::from(raw);
        assert!((record.price - 0.62).abs() < f64::EPSILON);
        assert!((record.volume_base - 150.5).abs() < f64::EPSILON);
        assert_eq!(record.timestamp, 1_737_936_000);
        assert_eq!(record.trader, "0x9a");
    }

    #[test]
    fn test_raw_book_maps_to_summary() {
        let raw: RawBook = serde_json::from_str(
            r#"
            {
                "market": "Will it happen?",
                "asset_id": "7131",
                "timestamp": "1737936000000",
                "bids": [ { "price": "0.61", "size": "100" } ],
                "asks": [ { "price": 0.63, "size": 80 } ],
                "hash": "abc123"
            }
            "#,
        )
        .unwrap();
        let summary = OrderBookSummary::from(raw);
        assert_eq!(summary.asset_id, "7131");
        assert_eq!(summary.bids.len(), 1);
        assert!((summary.asks[0].price - 0.63).abs() < f64::EPSILON);
        assert_eq!(summary.hash, "abc123");
    }
}
