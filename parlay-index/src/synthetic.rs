//! Synthetic data policy: the single place pseudo-random placeholder values
//! come from.
//!
//! Fallback markets, basic-mode placeholder metrics, and the substitute
//! daily series are all drawn through [`SyntheticPolicy`], injected into the
//! compositor so tests (and reproducible demos) can swap in a deterministic
//! generator. None of these values are real financial computation.

use crate::market::TradeRecord;
use chrono::Utc;
use rand::Rng;
use smol_str::SmolStr;

/// Trader tag carried by synthesized series records.
pub const SYNTHETIC_TRADER: &str = "synthetic";

/// Strategy producing placeholder values where live data is unavailable.
///
/// Ranges (inherited from the upstream placeholder policy):
/// - `fallback_price`: `[0.70, 0.95)`
/// - `fallback_remaining_hours`: `[0, 72)`
/// - `fallback_volume`: `[0, 1e6)`
/// - `end_offset_hours`: `[0, 168)` (up to 7 days out)
/// - `price_change_pct`: `[-5, +5]`
/// - `placeholder_avg_price`: `[0.75, 0.95)`
/// - `placeholder_yield`: `[5, 45)` percent
/// - `placeholder_volume_millions`: `[0.1, 5.0)`
pub trait SyntheticPolicy: Send + Sync {
    fn fallback_price(&self) -> f64;
    fn fallback_remaining_hours(&self) -> f64;
    fn fallback_volume(&self) -> f64;
    fn end_offset_hours(&self) -> f64;
    fn price_change_pct(&self) -> f64;
    fn placeholder_avg_price(&self) -> f64;
    fn placeholder_yield(&self) -> f64;
    fn placeholder_volume_millions(&self) -> f64;

    /// A `points`-long daily series ending now, ascending by timestamp.
    fn daily_series(&self, points: usize) -> Vec<TradeRecord>;
}

/// Production policy backed by the thread-local RNG.
#[derive(Copy, Clone, Debug, Default)]
pub struct RandomPolicy;

impl SyntheticPolicy for RandomPolicy {
    fn fallback_price(&self) -> f64 {
        rand::rng().random_range(0.70..0.95)
    }

    fn fallback_remaining_hours(&self) -> f64 {
        rand::rng().random_range(0.0..72.0)
    }

    fn fallback_volume(&self) -> f64 {
        rand::rng().random_range(0.0..1_000_000.0)
    }

    fn end_offset_hours(&self) -> f64 {
        rand::rng().random_range(0.0..168.0)
    }

    fn price_change_pct(&self) -> f64 {
        rand::rng().random_range(-5.0..=5.0)
    }

    fn placeholder_avg_price(&self) -> f64 {
        rand::rng().random_range(0.75..0.95)
    }

    fn placeholder_yield(&self) -> f64 {
        rand::rng().random_range(5.0..45.0)
    }

    fn placeholder_volume_millions(&self) -> f64 {
        rand::rng().random_range(0.1..5.0)
    }

    fn daily_series(&self, points: usize) -> Vec<TradeRecord> {
        let mut rng = rand::rng();
        let now = Utc::now().timestamp();
        let mut price: f64 = rng.random_range(0.30..0.70);

        (0..points)
            .map(|point| {
                price = (price + rng.random_range(-0.05..0.05)).clamp(0.01, 0.99);
                TradeRecord {
                    price,
                    volume_base: rng.random_range(0.0..5_000.0),
                    timestamp: now - (points.saturating_sub(point + 1) as i64) * 86_400,
                    trader: SmolStr::new_static(SYNTHETIC_TRADER),
                }
            })
            .collect()
    }
}

/// Deterministic policy for tests: every draw returns a fixed value.
#[derive(Clone, Debug)]
pub struct StaticPolicy {
    pub price: f64,
    pub remaining_hours: f64,
    pub volume: f64,
    pub end_offset_hours: f64,
    pub price_change: f64,
    pub avg_price: f64,
    pub yield_value: f64,
    pub volume_millions: f64,
    pub series_price: f64,
}

impl Default for StaticPolicy {
    fn default() -> Self {
        Self {
            price: 0.80,
            remaining_hours: 36.0,
            volume: 250_000.0,
            end_offset_hours: 96.0,
            price_change: 1.25,
            avg_price: 0.85,
            yield_value: 20.0,
            volume_millions: 1.5,
            series_price: 0.50,
        }
    }
}

impl SyntheticPolicy for StaticPolicy {
    fn fallback_price(&self) -> f64 {
        self.price
    }

    fn fallback_remaining_hours(&self) -> f64 {
        self.remaining_hours
    }

    fn fallback_volume(&self) -> f64 {
        self.volume
    }

    fn end_offset_hours(&self) -> f64 {
        self.end_offset_hours
    }

    fn price_change_pct(&self) -> f64 {
        self.price_change
    }

    fn placeholder_avg_price(&self) -> f64 {
        self.avg_price
    }

    fn placeholder_yield(&self) -> f64 {
        self.yield_value
    }

    fn placeholder_volume_millions(&self) -> f64 {
        self.volume_millions
    }

    fn daily_series(&self, points: usize) -> Vec<TradeRecord> {
        let now = Utc::now().timestamp();
        (0..points)
            .map(|point| TradeRecord {
                price: self.series_price,
                volume_base: 1_000.0,
                timestamp: now - (points.saturating_sub(point + 1) as i64) * 86_400,
                trader: SmolStr::new_static(SYNTHETIC_TRADER),
            })
            .collect()
    }
}
