//! # Parlay Index
//!
//! Composite "index" engine over baskets of prediction-market positions.
//!
//! An index is a curated basket of binary-market positions (a market id plus
//! a YES/NO side) tracked as one display/trading unit. This crate owns the
//! data model and the transformation pipeline that turns raw per-market
//! feeds into that composite view:
//! - normalising provider records into [`market::Market`] snapshots,
//! - merging constituent trade series and bucketing them into OHLCV candles,
//! - aggregating per-asset order books,
//! - deriving index-level metrics (average price, 24h change, yield range,
//!   volume, market cap, settlement date),
//! - memoizing results and degrading to synthetic fallback data whenever an
//!   upstream fetch fails - resolution never surfaces a hard error.
//!
//! Wallet connectivity and on-chain transfers are external collaborators,
//! consumed through the traits in [`chain`].

/// Per-asset order book summaries and index-level aggregation.
pub mod book;

/// Memoization layer for markets, histories, books, and resolved indexes.
pub mod cache;

/// Wallet-session/ledger collaborator traits and mint/redeem orchestration.
pub mod chain;

/// The index compositor: resolution, fan-out, composite metrics, fallback.
pub mod composite;

/// The fixed catalog of predefined index definitions.
pub mod definitions;

/// Resolution error taxonomy.
pub mod error;

/// Trade-series merging and OHLCV candle generation.
pub mod history;

/// Normalised market snapshots and trade history types.
pub mod market;

/// Market-data provider abstraction and the REST implementation.
pub mod provider;

/// Injected synthetic-data policy for placeholder and fallback values.
pub mod synthetic;

// Re-export the types most consumers touch.
pub use book::{BookLevel, OrderBookSummary, aggregate_order_books};
pub use cache::{IndexCache, MarketKey};
pub use composite::{CompositeMetrics, Index, IndexCompositor, ResolutionDepth};
pub use definitions::{IndexDefinition, IndexStatus};
pub use error::IndexError;
pub use history::{CandleData, generate_candles, index_price_history};
pub use market::{Market, PositionSide, PriceHistory, TradeRecord};
pub use provider::{ExchangeRecord, MarketDataProvider, ProviderError, ProviderId, gamma::GammaClient};
pub use synthetic::{RandomPolicy, StaticPolicy, SyntheticPolicy};
