//! Intra-second price-path reconstruction and buy/sell volume split.
//!
//! A single second record carries only OHLC summaries for trade, bid, and
//! ask — not individual prints. To build a per-tick ladder we synthesize a
//! deterministic path of `n` price samples through the second's O→H→L→C
//! envelope (and the matching bid/ask envelopes), split each sample's
//! micro-volume between buy and sell using the bid/ask spread as an
//! aggressor-side proxy, and bucket the result by tick.

use super::types::{Ohlc, SecondRecord};
use std::collections::BTreeMap;

/// Tunables for the micro-allocation sample count and its volume scaling.
#[derive(Debug, Clone, Copy)]
pub struct MicroAllocConfig {
    pub alpha: f64,
    pub n_min: u32,
    pub n_max: u32,
}

impl Default for MicroAllocConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            n_min: 20,
            n_max: 300,
        }
    }
}

/// Result of allocating one second's volume across ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct MicroAllocation {
    pub buy_total: f64,
    pub sell_total: f64,
    /// tick -> (buy, sell), ascending by tick.
    pub deltas: BTreeMap<i32, (f64, f64)>,
}

/// Number of path samples for a second carrying `volume` units, scaled
/// linearly by `volume` and clamped to `[n_min, n_max]` so a single sparse
/// tick doesn't collapse to a single-point path and a single dense tick
/// doesn't blow up the ladder's cardinality.
fn micro_count(volume: i64, cfg: MicroAllocConfig) -> usize {
    let raw = (cfg.alpha * volume.max(0) as f64).round() as i64;
    raw.clamp(cfg.n_min as i64, cfg.n_max as i64) as usize
}

/// `count` points strictly between `a` (exclusive) and `b` (inclusive),
/// evenly spaced. Used to stitch the O→H, H→L, L→C legs into one path
/// without repeating the joint price at each leg boundary.
fn linspace_exclusive_start(a: f64, b: f64, count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    (1..=count)
        .map(|i| a + (b - a) * (i as f64) / (count as f64))
        .collect()
}

/// Builds the `n`-point O→H→L→C piecewise-linear path, split into three
/// legs of `n/3, n/3, n - 2*(n/3)` samples.
fn build_path(ohlc: &Ohlc, n: usize) -> Vec<f64> {
    let seg1 = n / 3;
    let seg2 = n / 3;
    let seg3 = n - seg1 - seg2;

    let mut path = Vec::with_capacity(n);
    path.extend(linspace_exclusive_start(ohlc.open, ohlc.high, seg1));
    path.extend(linspace_exclusive_start(ohlc.high, ohlc.low, seg2));
    path.extend(linspace_exclusive_start(ohlc.low, ohlc.close, seg3));
    path
}

/// Splits one sample's micro-volume into `(buy, sell)` using the bid/ask
/// envelope at the same path position as an aggressor-side proxy:
/// at-or-above ask is a buy, at-or-below bid is a sell, inside the spread
/// is split proportionally by distance from the bid, and a crossed or
/// zero-width spread is split evenly.
fn classify_sample(price: f64, bid: f64, ask: f64, micro_v: f64) -> (f64, f64) {
    let spread = ask - bid;
    if spread <= 0.0 {
        return (micro_v / 2.0, micro_v / 2.0);
    }
    if price >= ask {
        return (micro_v, 0.0);
    }
    if price <= bid {
        return (0.0, micro_v);
    }
    let buy_frac = (price - bid) / spread;
    (micro_v * buy_frac, micro_v * (1.0 - buy_frac))
}

/// Allocates one second's volume across ticks.
///
/// `second.volume` is assumed positive; callers (the adapter boundary, not
/// this function) are responsible for dropping zero-volume seconds before
/// they ever reach the aggregator.
pub fn micro_allocate(
    second: &SecondRecord,
    tick_size: f64,
    cfg: MicroAllocConfig,
) -> MicroAllocation {
    let n = micro_count(second.volume, cfg);
    let price_path = build_path(&second.trade, n);
    let bid_path = build_path(&second.bid, n);
    let ask_path = build_path(&second.ask, n);

    let micro_v = second.volume as f64 / n as f64;

    let mut buy_total = 0.0;
    let mut sell_total = 0.0;
    let mut deltas: BTreeMap<i32, (f64, f64)> = BTreeMap::new();

    for i in 0..n {
        let (buy_inc, sell_inc) =
            classify_sample(price_path[i], bid_path[i], ask_path[i], micro_v);
        buy_total += buy_inc;
        sell_total += sell_inc;

        let tick = (price_path[i] / tick_size).round() as i32;
        let entry = deltas.entry(tick).or_insert((0.0, 0.0));
        entry.0 += buy_inc;
        entry.1 += sell_inc;
    }

    MicroAllocation {
        buy_total,
        sell_total,
        deltas,
    }
}
