use crate::{
    book::{self, OrderBookSummary},
    cache::{IndexCache, MarketKey},
    definitions::{self, IndexDefinition, IndexStatus},
    error::IndexError,
    history,
    market::{Market, PositionSide, TradeRecord},
    provider::{MarketDataProvider, ProviderId},
    synthetic::SyntheticPolicy,
};
use chrono::{Days, Duration, Utc};
use futures::future::join_all;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Confirmed-yield percentage reported for settled indexes whose definition
/// does not pin one.
pub const DEFAULT_CONFIRMED_YIELD: f64 = 8.5;

/// Fixed figures reported by the settled branch, regardless of live data.
const SETTLED_PRICE_CHANGE: &str = "+0.00%";
const SETTLED_VOLUME: f64 = 0.05;
const SETTLED_MARKET_CAP: f64 = 0.1;

/// Placeholder yield figures for a live index with no constituents.
const EMPTY_YIELD_RANGE: &str = "+7.5%";
const EMPTY_YIELD_LOSS: &str = "-3.2%";

/// How much of a constituent pipeline one resolution runs.
///
/// `Basic` stops after the market snapshot (list views); `Full` also fetches
/// price history and order books. Both depths share one composite-field
/// pipeline - the depth only gates the sub-fetches and which fields fall back
/// to placeholder values.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ResolutionDepth {
    Basic,
    Full,
}

/// Index-level metrics derived from constituent data by the compositor.
///
/// Percentage fields are preformatted display strings (`"+33.9%"`).
/// `yield_loss` stays unset on settled indexes - only the live branch writes
/// it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct CompositeMetrics {
    pub days_remaining: u64,
    pub expired: bool,
    /// Expected resolution date, `YYYYMMDD`.
    pub settlement_date: String,
    /// Mean constituent price, 2 decimals; absent without constituents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_price: Option<f64>,
    /// Total constituent volume in millions, 2 decimals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    pub price_change_24h: String,
    pub yield_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yield_loss: Option<String>,
    pub market_cap: f64,
}

/// A resolved index: its definition, constituent markets, and derived
/// metrics. Produced only by the [`IndexCompositor`] - `markets[i]` always
/// corresponds to the definition's `market_ids[i]`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Index {
    pub id: SmolStr,
    pub name: String,
    pub provider: ProviderId,
    pub market_ids: Vec<SmolStr>,
    pub position_codes: Vec<i64>,
    pub contract_address: String,
    pub status: IndexStatus,
    pub resolution_time: String,
    pub markets: Vec<Market>,
    #[serde(flatten)]
    pub metrics: CompositeMetrics,
}

impl Index {
    /// Assemble a resolved index from its definition, constituent slots, and
    /// computed metrics.
    pub fn assemble(
        definition: &IndexDefinition,
        markets: Vec<Market>,
        metrics: CompositeMetrics,
    ) -> Self {
        Self {
            id: definition.id.clone(),
            name: definition.name.clone(),
            provider: definition.provider,
            market_ids: definition.market_ids.clone(),
            position_codes: definition.position_codes.clone(),
            contract_address: definition.contract_address.clone(),
            status: definition.status,
            resolution_time: definition.resolution_time.clone(),
            markets,
            metrics,
        }
    }
}

/// Orchestrates index resolution: fans out per-constituent fetches, absorbs
/// per-slot failures into fallback markets, computes composite metrics, and
/// memoizes complete indexes.
///
/// The public resolve methods are total - they always return a usable
/// [`Index`] and never propagate an error past this boundary.
pub struct IndexCompositor {
    provider: Arc<dyn MarketDataProvider>,
    cache: Arc<IndexCache>,
    synthetic: Arc<dyn SyntheticPolicy>,
}

impl IndexCompositor {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        cache: Arc<IndexCache>,
        synthetic: Arc<dyn SyntheticPolicy>,
    ) -> Self {
        Self {
            provider,
            cache,
            synthetic,
        }
    }

    /// Resolve one index with constituent price history and order books.
    pub async fn resolve_full(&self, id: &str) -> Index {
        self.resolve(id, ResolutionDepth::Full).await
    }

    /// Resolve one index from market snapshots only (list views).
    pub async fn resolve_basic(&self, id: &str) -> Index {
        self.resolve(id, ResolutionDepth::Basic).await
    }

    /// Resolve every catalog index at basic depth, in catalog order.
    pub async fn resolve_all_basic(&self) -> Vec<Index> {
        join_all(
            definitions::definitions()
                .iter()
                .map(|definition| self.resolve_definition(definition, ResolutionDepth::Basic)),
        )
        .await
    }

    /// Merged constituent trade series for an already-resolved index.
    pub fn price_history(&self, index: &Index) -> Vec<TradeRecord> {
        history::index_price_history(index, self.synthetic.as_ref())
    }

    /// Aggregated per-asset order book for an already-resolved index.
    pub fn order_book(&self, index: &Index) -> IndexMap<SmolStr, OrderBookSummary> {
        book::aggregate_order_books(index)
    }

    async fn resolve(&self, id: &str, depth: ResolutionDepth) -> Index {
        if depth == ResolutionDepth::Full {
            if let Some(hit) = self.cache.index(id) {
                debug!(index = id, "index cache hit");
                return hit;
            }
        }

        match definitions::find(id) {
            Some(definition) => match self.try_resolve(definition, depth).await {
                Ok(index) => {
                    if depth == ResolutionDepth::Full {
                        self.cache.set_index(index.clone());
                    }
                    index
                }
                Err(error) => {
                    warn!(index = id, %error, "serving fallback index");
                    self.fallback_index(definition)
                }
            },
            None => {
                warn!(index = id, error = %IndexError::DefinitionNotFound(id.into()),
                    "serving fallback index");
                self.fallback_index(&IndexDefinition::adhoc(id))
            }
        }
    }

    /// Resolve a specific definition. Total: a failure anywhere on the whole
    /// path degrades to the fallback index rather than an error.
    pub async fn resolve_definition(
        &self,
        definition: &IndexDefinition,
        depth: ResolutionDepth,
    ) -> Index {
        match self.try_resolve(definition, depth).await {
            Ok(index) => index,
            Err(error) => {
                warn!(index = %definition.id, %error, "serving fallback index");
                self.fallback_index(definition)
            }
        }
    }

    async fn try_resolve(
        &self,
        definition: &IndexDefinition,
        depth: ResolutionDepth,
    ) -> Result<Index, IndexError> {
        if definition.market_ids.len() != definition.position_codes.len() {
            return Err(IndexError::MalformedDefinition {
                id: definition.id.clone(),
                market_count: definition.market_ids.len(),
                code_count: definition.position_codes.len(),
            });
        }

        let total = definition.market_ids.len();
        // Fan out one recoverable pipeline per constituent; join_all keeps
        // slot order independent of completion order.
        let markets = join_all(definition.market_ids.iter().enumerate().map(
            |(slot, market_id)| {
                let code = definition.position_codes[slot];
                self.resolve_constituent(definition.provider, market_id, slot, total, code, depth)
            },
        ))
        .await;

        let metrics = self.composite_metrics(definition, &markets, depth);
        Ok(Index::assemble(definition, markets, metrics))
    }

    /// One constituent's pipeline. Total: any failed step substitutes the
    /// fallback market for this slot only, leaving siblings untouched.
    async fn resolve_constituent(
        &self,
        provider: ProviderId,
        market_id: &SmolStr,
        slot: usize,
        total: usize,
        code: i64,
        depth: ResolutionDepth,
    ) -> Market {
        match self
            .fetch_constituent(provider, market_id, total, code, depth)
            .await
        {
            Ok(market) => market,
            Err(error) => {
                warn!(%market_id, slot, %error, "substituting fallback market");
                self.fallback_market(provider, market_id, total, code)
            }
        }
    }

    async fn fetch_constituent(
        &self,
        provider: ProviderId,
        market_id: &SmolStr,
        total: usize,
        code: i64,
        depth: ResolutionDepth,
    ) -> Result<Market, IndexError> {
        let key = MarketKey::new(provider, market_id.clone());

        let mut market = match self.cache.market(&key) {
            Some(hit) => hit,
            None => {
                let record = self.provider.fetch_exchange(provider, market_id).await?;
                let snapshot = Market::from_record(provider, &record);
                self.cache.set_market(key.clone(), snapshot.clone());
                snapshot
            }
        };

        // The slot, not the provider record, decides side and weight.
        market.position = PositionSide::from_code(code);
        market.proportion = 1.0 / total as f64;

        if depth == ResolutionDepth::Full {
            let history = match self.cache.history(&key) {
                Some(hit) => hit,
                None => {
                    let fetched = self
                        .provider
                        .fetch_price_history(provider, market_id)
                        .await?;
                    self.cache.set_history(key.clone(), fetched.clone());
                    fetched
                }
            };
            market.volume = history.traded_volume();
            market.price_history = Some(history);

            let book = match self.cache.book(&key) {
                Some(hit) => hit,
                None => {
                    let fetched = self.provider.fetch_order_book(provider, market_id).await?;
                    self.cache.set_book(key.clone(), fetched.clone());
                    fetched
                }
            };
            market.order_book = Some(book);
        }

        Ok(market)
    }

    /// Synthetic stand-in for a constituent whose live fetch failed.
    fn fallback_market(
        &self,
        provider: ProviderId,
        market_id: &str,
        total: usize,
        code: i64,
    ) -> Market {
        let end_offset = self.synthetic.end_offset_hours();
        Market {
            id: SmolStr::from(market_id),
            provider,
            name: market_id.to_string(),
            category: crate::market::DEFAULT_CATEGORY.to_string(),
            description: String::new(),
            icon: String::new(),
            price: self.synthetic.fallback_price(),
            proportion: 1.0 / total.max(1) as f64,
            position: PositionSide::from_code(code),
            remaining_hours: self.synthetic.fallback_remaining_hours(),
            end_time: Some(Utc::now() + Duration::seconds((end_offset * 3600.0) as i64)),
            volume: self.synthetic.fallback_volume(),
            price_history: None,
            order_book: None,
        }
    }

    /// Last-resort index for an unknown id or a wholesale resolution
    /// failure: the definition's identity with one fallback market per
    /// declared slot and placeholder metrics.
    fn fallback_index(&self, definition: &IndexDefinition) -> Index {
        let total = definition.market_ids.len();
        let markets = definition
            .market_ids
            .iter()
            .enumerate()
            .map(|(slot, market_id)| {
                let code = definition.position_codes.get(slot).copied().unwrap_or(0);
                self.fallback_market(definition.provider, market_id, total, code)
            })
            .collect();

        let metrics = self.placeholder_metrics(definition);
        Index::assemble(definition, markets, metrics)
    }

    fn composite_metrics(
        &self,
        definition: &IndexDefinition,
        markets: &[Market],
        depth: ResolutionDepth,
    ) -> CompositeMetrics {
        let days_remaining = parse_days_remaining(&definition.resolution_time);
        let expired = definition.is_expired();

        let mut metrics = CompositeMetrics {
            days_remaining,
            expired,
            settlement_date: settlement_date(days_remaining),
            ..Default::default()
        };

        if !markets.is_empty() {
            let mean = markets.iter().map(|market| market.price).sum::<f64>()
                / markets.len() as f64;
            metrics.avg_price = Some(round2(mean));
        }

        match depth {
            ResolutionDepth::Full => {
                if !markets.is_empty() {
                    let total = markets.iter().map(|market| market.volume).sum::<f64>();
                    metrics.volume = Some(round2(total / 1_000_000.0));
                }
                metrics.price_change_24h = self.price_change_24h(markets);
            }
            ResolutionDepth::Basic => {
                // No history is fetched at basic depth, so both fields are
                // placeholder draws.
                if metrics.avg_price.is_none() {
                    metrics.avg_price = Some(self.synthetic.placeholder_avg_price());
                }
                metrics.price_change_24h = format_signed_pct2(self.synthetic.price_change_pct());
            }
        }

        if expired {
            self.apply_settled_branch(definition, &mut metrics);
        } else {
            match depth {
                ResolutionDepth::Full => {
                    if markets.is_empty() {
                        metrics.yield_range = EMPTY_YIELD_RANGE.to_string();
                        metrics.yield_loss = Some(EMPTY_YIELD_LOSS.to_string());
                    } else {
                        // Average over every constituent, not only those with
                        // a usable contribution.
                        let yield_value = markets.iter().map(yield_contribution).sum::<f64>()
                            / markets.len() as f64;
                        metrics.yield_range = format_signed_pct1(yield_value);
                        metrics.yield_loss = Some(format_signed_pct1(-(yield_value * 0.5)));
                    }
                }
                ResolutionDepth::Basic => {
                    let yield_value = self.synthetic.placeholder_yield();
                    metrics.yield_range = format_signed_pct1(yield_value);
                    metrics.yield_loss = Some(format_signed_pct1(-(yield_value * 0.5)));
                    metrics.volume = Some(round2(self.synthetic.placeholder_volume_millions()));
                }
            }
            metrics.market_cap = match metrics.volume {
                Some(volume) if volume != 0.0 => round2(volume * 2.0),
                _ => 0.0,
            };
        }

        metrics
    }

    /// Placeholder metrics for the fallback index - basic-mode ranges, no
    /// live computation.
    fn placeholder_metrics(&self, definition: &IndexDefinition) -> CompositeMetrics {
        let days_remaining = parse_days_remaining(&definition.resolution_time);
        let expired = definition.is_expired();

        let mut metrics = CompositeMetrics {
            days_remaining,
            expired,
            settlement_date: settlement_date(days_remaining),
            avg_price: Some(self.synthetic.placeholder_avg_price()),
            price_change_24h: format_signed_pct2(self.synthetic.price_change_pct()),
            ..Default::default()
        };

        if expired {
            self.apply_settled_branch(definition, &mut metrics);
        } else {
            let yield_value = self.synthetic.placeholder_yield();
            metrics.yield_range = format_signed_pct1(yield_value);
            metrics.yield_loss = Some(format_signed_pct1(-(yield_value * 0.5)));
            let volume = round2(self.synthetic.placeholder_volume_millions());
            metrics.volume = Some(volume);
            metrics.market_cap = if volume != 0.0 { round2(volume * 2.0) } else { 0.0 };
        }

        metrics
    }

    /// Settled indexes report a fixed confirmed-yield narrative; live data
    /// never feeds these figures again.
    fn apply_settled_branch(&self, definition: &IndexDefinition, metrics: &mut CompositeMetrics) {
        let confirmed = definition
            .confirmed_yield
            .unwrap_or(DEFAULT_CONFIRMED_YIELD);
        metrics.yield_range = format!("+{confirmed}%");
        metrics.price_change_24h = SETTLED_PRICE_CHANGE.to_string();
        metrics.volume = Some(SETTLED_VOLUME);
        metrics.market_cap = SETTLED_MARKET_CAP;
    }

    fn price_change_24h(&self, markets: &[Market]) -> String {
        let changes: Vec<f64> = markets
            .iter()
            .filter_map(|market| {
                let primary = market.price_history.as_ref()?.primary()?;
                if primary.len() < 2 {
                    return None;
                }
                let oldest = primary.first()?.price;
                let latest = primary.last()?.price;
                Some((latest - oldest) / oldest)
            })
            .collect();

        if changes.is_empty() {
            // No constituent has usable history: placeholder, not computed.
            format_signed_pct2(self.synthetic.price_change_pct())
        } else {
            let mean = changes.iter().sum::<f64>() / changes.len() as f64;
            format_signed_pct2(mean * 100.0)
        }
    }
}

/// Yield contribution of one constituent, percent.
///
/// A YES position pays `1` per share, so the upside over price `p` is
/// `1/p - 1`; a NO position costs `1 - p`. Degenerate prices (`0` for YES,
/// `>= 1` for NO) contribute nothing.
fn yield_contribution(market: &Market) -> f64 {
    match market.position {
        PositionSide::Yes if market.price > 0.0 => (1.0 / market.price - 1.0) * 100.0,
        PositionSide::Yes => 0.0,
        _ if market.price < 1.0 => (1.0 / (1.0 - market.price) - 1.0) * 100.0,
        _ => 0.0,
    }
}

/// Extract `N` from the first `"<N> day(s)"` in free-text resolution time;
/// `0` when no such pattern exists.
pub(crate) fn parse_days_remaining(text: &str) -> u64 {
    let mut previous: Option<u64> = None;
    for token in text.split_whitespace() {
        let word = token
            .trim_matches(|c: char| !c.is_ascii_alphanumeric())
            .to_ascii_lowercase();
        if (word == "day" || word == "days") && previous.is_some() {
            return previous.unwrap_or(0);
        }
        previous = word.parse().ok();
    }
    0
}

/// Today plus `days`, formatted `YYYYMMDD`.
fn settlement_date(days: u64) -> String {
    (Utc::now().date_naive() + Days::new(days))
        .format("%Y%m%d")
        .to_string()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn format_signed_pct2(pct: f64) -> String {
    format!("{pct:+.2}%")
}

fn format_signed_pct1(pct: f64) -> String {
    format!("{pct:+.1}%")
}
