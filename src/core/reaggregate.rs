//! Lazy re-aggregation of already-finalized V-bars into coarser
//! volume-threshold bars, without materializing a whole symbol's history.

use super::types::VBar;
use std::collections::BTreeMap;

fn merge_bars(buffer: Vec<VBar>) -> VBar {
    let first = buffer.first().expect("merge_bars called with empty buffer");
    let last = buffer.last().expect("merge_bars called with empty buffer");

    let high_i = buffer.iter().map(|b| b.high_i).max().unwrap();
    let low_i = buffer.iter().map(|b| b.low_i).min().unwrap();
    let total_volume = buffer.iter().map(|b| b.total_volume).sum();
    let buy_volume = buffer.iter().map(|b| b.buy_volume).sum();
    let sell_volume = buffer.iter().map(|b| b.sell_volume).sum();

    let mut merged: BTreeMap<i32, (i64, i64)> = BTreeMap::new();
    for bar in &buffer {
        for ((tick, buy), sell) in bar
            .prices_i
            .iter()
            .zip(bar.vol_buy.iter())
            .zip(bar.vol_sell.iter())
        {
            let entry = merged.entry(*tick).or_insert((0, 0));
            entry.0 += *buy as i64;
            entry.1 += *sell as i64;
        }
    }

    VBar {
        trade_date: first.trade_date,
        start_time: first.start_time,
        end_time: last.end_time,
        open_i: first.open_i,
        high_i,
        low_i,
        close_i: last.close_i,
        total_volume,
        buy_volume,
        sell_volume,
        prices_i: merged.keys().copied().collect(),
        vol_buy: merged.values().map(|(b, _)| *b as i32).collect(),
        vol_sell: merged.values().map(|(_, s)| *s as i32).collect(),
    }
}

struct Reaggregate<I> {
    inner: I,
    target_v: i64,
    keep_partial_tail: bool,
    buffer: Vec<VBar>,
    accumulated: i64,
    finished: bool,
}

impl<I: Iterator<Item = VBar>> Iterator for Reaggregate<I> {
    type Item = VBar;

    fn next(&mut self) -> Option<VBar> {
        if self.finished {
            return None;
        }
        loop {
            match self.inner.next() {
                Some(bar) => {
                    self.accumulated += bar.total_volume;
                    self.buffer.push(bar);
                    if self.accumulated >= self.target_v {
                        let buffer = std::mem::take(&mut self.buffer);
                        self.accumulated = 0;
                        return Some(merge_bars(buffer));
                    }
                }
                None => {
                    self.finished = true;
                    if !self.buffer.is_empty() && self.keep_partial_tail {
                        let buffer = std::mem::take(&mut self.buffer);
                        return Some(merge_bars(buffer));
                    }
                    return None;
                }
            }
        }
    }
}

/// Merges a stream of V-bars into coarser bars of (at least) `target_v`
/// volume each. If `keep_partial_tail` is set, any leftover bars at the end
/// of `bars` are emitted as one final undersized bar; otherwise they are
/// dropped.
pub fn reaggregate<I: Iterator<Item = VBar>>(
    bars: I,
    target_v: i64,
    keep_partial_tail: bool,
) -> impl Iterator<Item = VBar> {
    Reaggregate {
        inner: bars,
        target_v,
        keep_partial_tail,
        buffer: Vec::new(),
        accumulated: 0,
        finished: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(idx: i32, volume: i64, buy: i64, sell: i64) -> VBar {
        let t = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
            + chrono::Duration::minutes(idx as i64);
        VBar {
            trade_date: 20240501,
            start_time: t,
            end_time: t + chrono::Duration::minutes(1),
            open_i: 100 + idx,
            high_i: 105 + idx,
            low_i: 95 + idx,
            close_i: 102 + idx,
            total_volume: volume,
            buy_volume: buy,
            sell_volume: sell,
            prices_i: vec![100 + idx, 102 + idx],
            vol_buy: vec![(buy / 2) as i32, (buy - buy / 2) as i32],
            vol_sell: vec![(sell / 2) as i32, (sell - sell / 2) as i32],
        }
    }

    #[test]
    fn test_merges_until_threshold() {
        let bars = vec![bar(0, 400, 250, 150), bar(1, 400, 200, 200), bar(2, 400, 300, 100)];
        let merged: Vec<VBar> = reaggregate(bars.into_iter(), 800, true).collect();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].total_volume, 800);
        assert_eq!(merged[1].total_volume, 400);
    }

    #[test]
    fn test_drops_tail_when_not_kept() {
        let bars = vec![bar(0, 400, 250, 150), bar(1, 100, 50, 50)];
        let merged: Vec<VBar> = reaggregate(bars.into_iter(), 800, false).collect();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_open_close_taken_from_first_and_last() {
        let bars = vec![bar(0, 500, 300, 200), bar(1, 500, 300, 200)];
        let merged: Vec<VBar> = reaggregate(bars.clone().into_iter(), 1_000, true).collect();
        assert_eq!(merged[0].open_i, bars[0].open_i);
        assert_eq!(merged[0].close_i, bars[1].close_i);
    }
}
