//! Streaming volume-threshold bar segmentation.
//!
//! [`VBarAggregator`] is a single-writer state machine: [`VBarAggregator::step`]
//! consumes one [`SecondRecord`] at a time and returns a finished [`VBar`]
//! exactly when the bar's cumulative volume crosses the configured
//! threshold, mirroring a price-threshold breach detector generalized to a
//! volume threshold. [`VBarAggregator::finish_day`] flushes whatever is left
//! in progress as a (possibly undersized) tail bar at day end.

use super::micro_allocator::{micro_allocate, MicroAllocConfig, MicroAllocation};
use super::types::{SecondRecord, VBar};
use chrono::{Datelike, Duration, NaiveDateTime};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("seconds out of order: prev={prev} curr={curr}")]
    UnsortedSeconds {
        prev: NaiveDateTime,
        curr: NaiveDateTime,
    },
    #[error("invalid v_unit {v_unit}, must be positive")]
    InvalidVUnit { v_unit: i64 },
    #[error("malformed bar: {reason}")]
    MalformedBar { reason: String },
}

struct Accum {
    trade_date: i32,
    start_time: NaiveDateTime,
    last_end_time: NaiveDateTime,
    trade_open: f64,
    trade_high: f64,
    trade_low: f64,
    trade_close: f64,
    total_volume_sum: f64,
    buy_volume_sum: f64,
    sell_volume_sum: f64,
    bucket_map: BTreeMap<i32, (f64, f64)>,
}

fn yyyymmdd(t: NaiveDateTime) -> i32 {
    let d = t.date();
    d.year() * 10_000 + d.month() as i32 * 100 + d.day() as i32
}

impl Accum {
    fn new(second: &SecondRecord) -> Self {
        Self {
            trade_date: yyyymmdd(second.time),
            start_time: second.time,
            last_end_time: second.time + Duration::seconds(1),
            trade_open: second.trade.open,
            trade_high: second.trade.high,
            trade_low: second.trade.low,
            trade_close: second.trade.close,
            total_volume_sum: 0.0,
            buy_volume_sum: 0.0,
            sell_volume_sum: 0.0,
            bucket_map: BTreeMap::new(),
        }
    }

    fn update(&mut self, second: &SecondRecord, alloc: &MicroAllocation) {
        self.trade_high = self.trade_high.max(second.trade.high);
        self.trade_low = self.trade_low.min(second.trade.low);
        self.trade_close = second.trade.close;
        self.last_end_time = second.time + Duration::seconds(1);
        self.total_volume_sum += second.volume as f64;
        self.buy_volume_sum += alloc.buy_total;
        self.sell_volume_sum += alloc.sell_total;
        for (&tick, &(b, s)) in alloc.deltas.iter() {
            let entry = self.bucket_map.entry(tick).or_insert((0.0, 0.0));
            entry.0 += b;
            entry.1 += s;
        }
    }
}

/// Rounds `values` to integers whose sum is exactly `target_total`, by
/// rounding each value to nearest and then walking the residual onto the
/// entries with the largest rounding error — never decrementing an entry
/// already at zero.
fn round_preserve_total(values: &[f64], target_total: i64) -> Vec<i64> {
    let mut rounded: Vec<i64> = values.iter().map(|v| v.round() as i64).collect();
    if rounded.is_empty() {
        return rounded;
    }
    let diff = target_total - rounded.iter().sum::<i64>();
    if diff == 0 {
        return rounded;
    }

    let n = values.len();
    if diff > 0 {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            let ea = values[a] - rounded[a] as f64;
            let eb = values[b] - rounded[b] as f64;
            eb.partial_cmp(&ea).unwrap()
        });
        for &i in order.iter().take(diff as usize) {
            rounded[i] += 1;
        }
    } else {
        let need = (-diff) as usize;
        let mut order: Vec<usize> = (0..n).filter(|&i| rounded[i] > 0).collect();
        order.sort_by(|&a, &b| {
            let ea = rounded[a] as f64 - values[a];
            let eb = rounded[b] as f64 - values[b];
            eb.partial_cmp(&ea).unwrap()
        });
        for &i in order.iter().take(need) {
            rounded[i] -= 1;
        }
    }
    rounded
}

fn finalize(accum: Accum, tick_size: f64) -> Result<VBar, AggregatorError> {
    if accum.bucket_map.is_empty() {
        return Err(AggregatorError::MalformedBar {
            reason: "bar accumulated volume but has an empty price ladder".into(),
        });
    }

    let ticks: Vec<i32> = accum.bucket_map.keys().copied().collect();
    let buy_vals: Vec<f64> = accum.bucket_map.values().map(|(b, _)| *b).collect();
    let sell_vals: Vec<f64> = accum.bucket_map.values().map(|(_, s)| *s).collect();

    let buy_target = accum.buy_volume_sum.round().max(0.0) as i64;
    let sell_target = accum.sell_volume_sum.round().max(0.0) as i64;

    let buy_int = round_preserve_total(&buy_vals, buy_target);
    let sell_int = round_preserve_total(&sell_vals, sell_target);

    // The ladder is authoritative: total_volume is derived from the
    // rounded buy/sell sums rather than from an independent rounding of
    // `total_volume_sum`, which can disagree with `buy_target + sell_target`
    // by the usual +-1 rounding slack.
    let total_volume_int: i64 = buy_target + sell_target;

    let open_i = (accum.trade_open / tick_size).round() as i32;
    let high_i = (accum.trade_high / tick_size).round() as i32;
    let low_i = (accum.trade_low / tick_size).round() as i32;
    let close_i = (accum.trade_close / tick_size).round() as i32;

    if low_i > open_i || low_i > close_i || low_i > high_i || high_i < open_i || high_i < close_i {
        return Err(AggregatorError::MalformedBar {
            reason: format!(
                "OHLC out of order: o={open_i} h={high_i} l={low_i} c={close_i}"
            ),
        });
    }

    let final_buy_sum: i64 = buy_int.iter().sum();
    let final_sell_sum: i64 = sell_int.iter().sum();
    if final_buy_sum + final_sell_sum != total_volume_int {
        return Err(AggregatorError::MalformedBar {
            reason: "volume conservation violated after reconciliation".into(),
        });
    }

    Ok(VBar {
        trade_date: accum.trade_date,
        start_time: accum.start_time,
        end_time: accum.last_end_time,
        open_i,
        high_i,
        low_i,
        close_i,
        total_volume: total_volume_int,
        buy_volume: final_buy_sum,
        sell_volume: final_sell_sum,
        prices_i: ticks,
        vol_buy: buy_int.into_iter().map(|v| v as i32).collect(),
        vol_sell: sell_int.into_iter().map(|v| v as i32).collect(),
    })
}

/// Single-writer streaming volume-bar aggregator. Create one per
/// `(symbol, trade_date)` and feed it seconds in ascending time order.
pub struct VBarAggregator {
    v_unit: i64,
    tick_size: f64,
    micro_cfg: MicroAllocConfig,
    state: Option<Accum>,
    last_time: Option<NaiveDateTime>,
}

impl VBarAggregator {
    pub fn new(v_unit: i64, tick_size: f64) -> Result<Self, AggregatorError> {
        if v_unit <= 0 {
            return Err(AggregatorError::InvalidVUnit { v_unit });
        }
        Ok(Self {
            v_unit,
            tick_size,
            micro_cfg: MicroAllocConfig::default(),
            state: None,
            last_time: None,
        })
    }

    pub fn with_micro_config(mut self, cfg: MicroAllocConfig) -> Self {
        self.micro_cfg = cfg;
        self
    }

    /// Folds one second into the in-progress bar, returning a completed
    /// bar exactly when accumulated volume reaches `v_unit`.
    pub fn step(&mut self, second: &SecondRecord) -> Result<Option<VBar>, AggregatorError> {
        if let Some(prev) = self.last_time {
            if second.time < prev {
                return Err(AggregatorError::UnsortedSeconds {
                    prev,
                    curr: second.time,
                });
            }
        }
        self.last_time = Some(second.time);

        if second.volume <= 0 {
            return Ok(None);
        }

        let alloc = micro_allocate(second, self.tick_size, self.micro_cfg);
        let accum = self.state.get_or_insert_with(|| Accum::new(second));
        accum.update(second, &alloc);

        if accum.total_volume_sum.round() as i64 >= self.v_unit {
            let accum = self.state.take().expect("just inserted");
            return finalize(accum, self.tick_size).map(Some);
        }
        Ok(None)
    }

    /// Flushes whatever is in progress as a final, possibly undersized,
    /// bar. Returns `None` if nothing has accumulated.
    pub fn finish_day(&mut self) -> Option<Result<VBar, AggregatorError>> {
        self.state.take().map(|accum| finalize(accum, self.tick_size))
    }
}

/// Batch convenience: aggregates a whole day's seconds at once, including
/// the trailing partial bar.
pub fn aggregate_day(
    seconds: &[SecondRecord],
    v_unit: i64,
    tick_size: f64,
) -> Result<Vec<VBar>, AggregatorError> {
    let mut aggregator = VBarAggregator::new(v_unit, tick_size)?;
    let mut bars = Vec::new();
    for second in seconds {
        if let Some(bar) = aggregator.step(second)? {
            bars.push(bar);
        }
    }
    if let Some(tail) = aggregator.finish_day() {
        bars.push(tail?);
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Ohlc;
    use chrono::NaiveDate;

    fn flat_second(t_offset: i64, price: f64, volume: i64) -> SecondRecord {
        let trade = Ohlc::new(price, price + 0.05, price - 0.05, price);
        let bid = Ohlc::new(price - 0.01, price + 0.04, price - 0.06, price - 0.01);
        let ask = Ohlc::new(price + 0.01, price + 0.06, price - 0.04, price + 0.01);
        SecondRecord {
            time: NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap()
                + Duration::seconds(t_offset),
            trade,
            volume,
            bid,
            ask,
        }
    }

    #[test]
    fn test_rejects_nonpositive_v_unit() {
        assert!(VBarAggregator::new(0, 0.01).is_err());
        assert!(VBarAggregator::new(-5, 0.01).is_err());
    }

    #[test]
    fn test_single_bar_threshold_breach() {
        let mut agg = VBarAggregator::new(1_000, 0.01).unwrap();
        let mut emitted = None;
        for i in 0..10 {
            let r = agg.step(&flat_second(i, 100.0, 150)).unwrap();
            if r.is_some() {
                emitted = r;
                break;
            }
        }
        let bar = emitted.expect("bar should close once >= 1000 units accumulate");
        assert!(bar.total_volume >= 1_000);
        assert_eq!(bar.buy_volume + bar.sell_volume, bar.total_volume);
    }

    #[test]
    fn test_finish_day_flushes_partial_tail() {
        let mut agg = VBarAggregator::new(1_000_000, 0.01).unwrap();
        agg.step(&flat_second(0, 100.0, 50)).unwrap();
        let tail = agg
            .finish_day()
            .expect("partial bar should be returned at day end")
            .unwrap();
        assert_eq!(tail.total_volume, 50);
        assert!(agg.finish_day().is_none());
    }

    #[test]
    fn test_unsorted_seconds_rejected() {
        let mut agg = VBarAggregator::new(1_000, 0.01).unwrap();
        agg.step(&flat_second(5, 100.0, 10)).unwrap();
        let err = agg.step(&flat_second(1, 100.0, 10)).unwrap_err();
        assert!(matches!(err, AggregatorError::UnsortedSeconds { .. }));
    }

    #[test]
    fn test_zero_volume_second_is_skipped() {
        let mut agg = VBarAggregator::new(1_000, 0.01).unwrap();
        assert!(agg.step(&flat_second(0, 100.0, 0)).unwrap().is_none());
        assert!(agg.finish_day().is_none());
    }

    #[test]
    fn test_round_preserve_total_conserves_sum() {
        let values = vec![1.4, 2.6, 3.5, 0.5];
        let out = round_preserve_total(&values, 9);
        assert_eq!(out.iter().sum::<i64>(), 9);
    }

    #[test]
    fn test_round_preserve_total_never_decrements_below_zero() {
        let values = vec![0.2, 0.2, 0.2];
        let out = round_preserve_total(&values, 0);
        assert!(out.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_aggregate_day_matches_streaming() {
        let seconds: Vec<SecondRecord> = (0..20)
            .map(|i| flat_second(i, 100.0 + i as f64 * 0.01, 100))
            .collect();
        let bars = aggregate_day(&seconds, 500, 0.01).unwrap();
        let total: i64 = bars.iter().map(|b| b.total_volume).sum();
        assert_eq!(total, 2_000);
    }
}
