use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Open/high/low/close envelope shared by trade, bid, and ask legs of a
/// [`SecondRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Ohlc {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }
}

/// One second of upstream data: the traded-price OHLC, the traded volume,
/// and the quote (bid/ask) OHLC for the same second.
///
/// A second with zero volume, or with any leg missing upstream, is never
/// constructed by a well-behaved adapter — see [`crate::providers`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondRecord {
    pub time: NaiveDateTime,
    pub trade: Ohlc,
    pub volume: i64,
    pub bid: Ohlc,
    pub ask: Ohlc,
}

/// A volume-partitioned footprint bar: OHLC in integer ticks, total/buy/sell
/// volume, and a per-tick buy/sell ladder.
///
/// Invariants upheld by every bar this crate emits (see
/// `core::aggregator::finalize`):
/// - `prices_i` is strictly ascending with no duplicate tick.
/// - `vol_buy.len() == vol_sell.len() == prices_i.len()`.
/// - `vol_buy.iter().sum::<i64>() + vol_sell.iter().sum::<i64>() == total_volume`.
/// - `buy_volume + sell_volume == total_volume`.
/// - `low_i <= open_i, close_i <= high_i` and `low_i <= high_i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VBar {
    pub trade_date: i32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub open_i: i32,
    pub high_i: i32,
    pub low_i: i32,
    pub close_i: i32,
    pub total_volume: i64,
    pub buy_volume: i64,
    pub sell_volume: i64,
    pub prices_i: Vec<i32>,
    pub vol_buy: Vec<i32>,
    pub vol_sell: Vec<i32>,
}

impl VBar {
    /// Converts an integer tick to a price, the only place that
    /// multiplication is allowed to reenter floating point after
    /// finalization.
    pub fn price(tick: i32, tick_size: f64) -> f64 {
        tick as f64 * tick_size
    }

    pub fn open(&self, tick_size: f64) -> f64 {
        Self::price(self.open_i, tick_size)
    }

    pub fn high(&self, tick_size: f64) -> f64 {
        Self::price(self.high_i, tick_size)
    }

    pub fn low(&self, tick_size: f64) -> f64 {
        Self::price(self.low_i, tick_size)
    }

    pub fn close(&self, tick_size: f64) -> f64 {
        Self::price(self.close_i, tick_size)
    }

    pub fn delta(&self) -> i64 {
        self.buy_volume - self.sell_volume
    }

    pub fn period(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }

    /// Per-tick `(buy, sell)` volume view, built on demand from the parallel
    /// ladder arrays.
    pub fn volume_at_price(&self) -> BTreeMap<i32, (i32, i32)> {
        self.prices_i
            .iter()
            .zip(self.vol_buy.iter())
            .zip(self.vol_sell.iter())
            .map(|((p, b), s)| (*p, (*b, *s)))
            .collect()
    }
}
