//! Parquet row schema and the `VBar <-> DataFrame` mapping.
//!
//! Columns: `trade_date:i32`, `start_time`/`end_time:datetime[ns]`,
//! `open_i/high_i/low_i/close_i:i32`,
//! `total_volume/buy_volume/sell_volume:i64`,
//! `prices_i/vol_buy/vol_sell:list[i32]`.

use crate::core::types::VBar;
use chrono::{DateTime, NaiveDateTime, Utc};
use polars::prelude::*;

fn to_ns(t: NaiveDateTime) -> i64 {
    t.and_utc().timestamp_nanos_opt().unwrap_or(0)
}

fn from_ns(ns: i64) -> NaiveDateTime {
    DateTime::<Utc>::from_timestamp(
        ns.div_euclid(1_000_000_000),
        (ns.rem_euclid(1_000_000_000)) as u32,
    )
    .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap())
    .naive_utc()
}

pub fn bars_to_dataframe(bars: &[VBar]) -> PolarsResult<DataFrame> {
    let trade_date: Vec<i32> = bars.iter().map(|b| b.trade_date).collect();
    let start_time_ns: Vec<i64> = bars.iter().map(|b| to_ns(b.start_time)).collect();
    let end_time_ns: Vec<i64> = bars.iter().map(|b| to_ns(b.end_time)).collect();
    let open_i: Vec<i32> = bars.iter().map(|b| b.open_i).collect();
    let high_i: Vec<i32> = bars.iter().map(|b| b.high_i).collect();
    let low_i: Vec<i32> = bars.iter().map(|b| b.low_i).collect();
    let close_i: Vec<i32> = bars.iter().map(|b| b.close_i).collect();
    let total_volume: Vec<i64> = bars.iter().map(|b| b.total_volume).collect();
    let buy_volume: Vec<i64> = bars.iter().map(|b| b.buy_volume).collect();
    let sell_volume: Vec<i64> = bars.iter().map(|b| b.sell_volume).collect();

    let prices_series: Vec<Series> = bars
        .iter()
        .map(|b| Series::new(PlSmallStr::EMPTY, &b.prices_i))
        .collect();
    let buy_series: Vec<Series> = bars
        .iter()
        .map(|b| Series::new(PlSmallStr::EMPTY, &b.vol_buy))
        .collect();
    let sell_series: Vec<Series> = bars
        .iter()
        .map(|b| Series::new(PlSmallStr::EMPTY, &b.vol_sell))
        .collect();

    let start_time = Series::new("start_time".into(), start_time_ns)
        .cast(&DataType::Datetime(TimeUnit::Nanoseconds, None))?;
    let end_time = Series::new("end_time".into(), end_time_ns)
        .cast(&DataType::Datetime(TimeUnit::Nanoseconds, None))?;

    DataFrame::new(vec![
        Series::new("trade_date".into(), trade_date).into(),
        start_time.into(),
        end_time.into(),
        Series::new("open_i".into(), open_i).into(),
        Series::new("high_i".into(), high_i).into(),
        Series::new("low_i".into(), low_i).into(),
        Series::new("close_i".into(), close_i).into(),
        Series::new("total_volume".into(), total_volume).into(),
        Series::new("buy_volume".into(), buy_volume).into(),
        Series::new("sell_volume".into(), sell_volume).into(),
        Series::new("prices_i".into(), prices_series).into(),
        Series::new("vol_buy".into(), buy_series).into(),
        Series::new("vol_sell".into(), sell_series).into(),
    ])
}

fn i32_list_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<Vec<i32>>> {
    let col = df.column(name)?.list()?;
    let mut out = Vec::with_capacity(col.len());
    for row in col.into_iter() {
        let values = match row {
            Some(s) => s.i32()?.into_no_null_iter().collect(),
            None => Vec::new(),
        };
        out.push(values);
    }
    Ok(out)
}

/// Reconstructs bars from a schema-conformant `DataFrame`, sorted
/// ascending by `start_time`.
pub fn dataframe_to_bars(df: &DataFrame) -> PolarsResult<Vec<VBar>> {
    let df = df.sort(["start_time"], SortMultipleOptions::default())?;

    let trade_date = df.column("trade_date")?.i32()?;
    let start_time = df.column("start_time")?.datetime()?;
    let end_time = df.column("end_time")?.datetime()?;
    let open_i = df.column("open_i")?.i32()?;
    let high_i = df.column("high_i")?.i32()?;
    let low_i = df.column("low_i")?.i32()?;
    let close_i = df.column("close_i")?.i32()?;
    let total_volume = df.column("total_volume")?.i64()?;
    let buy_volume = df.column("buy_volume")?.i64()?;
    let sell_volume = df.column("sell_volume")?.i64()?;
    let prices_i = i32_list_column(&df, "prices_i")?;
    let vol_buy = i32_list_column(&df, "vol_buy")?;
    let vol_sell = i32_list_column(&df, "vol_sell")?;

    let mut bars = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        bars.push(VBar {
            trade_date: trade_date.get(i).unwrap_or_default(),
            start_time: from_ns(start_time.get(i).unwrap_or_default()),
            end_time: from_ns(end_time.get(i).unwrap_or_default()),
            open_i: open_i.get(i).unwrap_or_default(),
            high_i: high_i.get(i).unwrap_or_default(),
            low_i: low_i.get(i).unwrap_or_default(),
            close_i: close_i.get(i).unwrap_or_default(),
            total_volume: total_volume.get(i).unwrap_or_default(),
            buy_volume: buy_volume.get(i).unwrap_or_default(),
            sell_volume: sell_volume.get(i).unwrap_or_default(),
            prices_i: prices_i[i].clone(),
            vol_buy: vol_buy[i].clone(),
            vol_sell: vol_sell[i].clone(),
        });
    }
    Ok(bars)
}
