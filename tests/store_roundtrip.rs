//! Store-layer integration tests: write/read round trips and idempotent
//! append semantics, independent of the aggregator or orchestrator.

use chrono::NaiveDate;
use footprint_engine::core::types::VBar;
use footprint_engine::store::{
    append_days, append_no_data_dates, metadata_path, read_day, read_metadata, read_range,
    year_file_path,
};

fn bar(trade_date: i32, y: i32, m: u32, d: u32, minute: i64, open_i: i32) -> VBar {
    let t = NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(9, 30, 0).unwrap()
        + chrono::Duration::minutes(minute);
    VBar {
        trade_date,
        start_time: t,
        end_time: t + chrono::Duration::minutes(1),
        open_i,
        high_i: open_i + 5,
        low_i: open_i - 5,
        close_i: open_i + 1,
        total_volume: 1_000,
        buy_volume: 600,
        sell_volume: 400,
        prices_i: vec![open_i - 5, open_i, open_i + 1, open_i + 5],
        vol_buy: vec![150, 250, 100, 100],
        vol_sell: vec![100, 150, 100, 50],
    }
}

#[test]
fn write_then_read_day_preserves_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let original = bar(20240102, 2024, 1, 2, 0, 10_000);
    append_days(
        dir.path(),
        "RT1",
        2024,
        &[(20240102, vec![original.clone()])],
        &[],
    )
    .unwrap();

    let read_back = read_day(dir.path(), "RT1", 2024, 20240102).unwrap();
    assert_eq!(read_back.len(), 1);
    let r = &read_back[0];
    assert_eq!(r.trade_date, original.trade_date);
    assert_eq!(r.start_time, original.start_time);
    assert_eq!(r.end_time, original.end_time);
    assert_eq!(r.open_i, original.open_i);
    assert_eq!(r.high_i, original.high_i);
    assert_eq!(r.low_i, original.low_i);
    assert_eq!(r.close_i, original.close_i);
    assert_eq!(r.total_volume, original.total_volume);
    assert_eq!(r.buy_volume, original.buy_volume);
    assert_eq!(r.sell_volume, original.sell_volume);
    assert_eq!(r.prices_i, original.prices_i);
    assert_eq!(r.vol_buy, original.vol_buy);
    assert_eq!(r.vol_sell, original.vol_sell);
}

#[test]
fn write_then_read_range_across_multiple_days_in_one_year() {
    let dir = tempfile::tempdir().unwrap();
    let days = vec![
        (20240102, vec![bar(20240102, 2024, 1, 2, 0, 10_000)]),
        (20240103, vec![bar(20240103, 2024, 1, 3, 0, 10_050)]),
    ];
    append_days(dir.path(), "RT2", 2024, &days, &[]).unwrap();

    let bars = read_range(
        dir.path(),
        "RT2",
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
    )
    .unwrap();
    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].trade_date, 20240102);
    assert_eq!(bars[1].trade_date, 20240103);
}

#[test]
fn appending_a_new_date_does_not_disturb_existing_dates() {
    let dir = tempfile::tempdir().unwrap();
    append_days(
        dir.path(),
        "RT3",
        2024,
        &[(20240102, vec![bar(20240102, 2024, 1, 2, 0, 10_000)])],
        &[],
    )
    .unwrap();
    append_days(
        dir.path(),
        "RT3",
        2024,
        &[(20240103, vec![bar(20240103, 2024, 1, 3, 0, 10_050)])],
        &[],
    )
    .unwrap();

    let first_day = read_day(dir.path(), "RT3", 2024, 20240102).unwrap();
    assert_eq!(first_day.len(), 1);
    assert_eq!(first_day[0].open_i, 10_000);

    let second_day = read_day(dir.path(), "RT3", 2024, 20240103).unwrap();
    assert_eq!(second_day.len(), 1);
    assert_eq!(second_day[0].open_i, 10_050);
}

#[test]
fn reappending_the_same_date_without_force_duplicates_rows() {
    // append_days's contract is: the caller decides what's "new" via
    // `new_days`/`force_recompute_dates`. Appending the same date twice
    // without listing it in `force_recompute_dates` is a caller bug, not
    // a store-level idempotency guarantee — the orchestrator is what
    // provides idempotency by only ever calling `append_days` with dates
    // it determined were actually missing or force-recomputed (see
    // `second_backfill_run_is_a_no_op_without_force_recompute` in
    // `scenarios.rs` for that higher-level guarantee).
    let dir = tempfile::tempdir().unwrap();
    let day_bars = vec![bar(20240102, 2024, 1, 2, 0, 10_000)];
    append_days(dir.path(), "RT4", 2024, &[(20240102, day_bars.clone())], &[]).unwrap();
    append_days(dir.path(), "RT4", 2024, &[(20240102, day_bars)], &[]).unwrap();

    let bars = read_day(dir.path(), "RT4", 2024, 20240102).unwrap();
    assert_eq!(bars.len(), 2);
}

#[test]
fn force_recompute_date_replaces_rather_than_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    append_days(
        dir.path(),
        "RT5",
        2024,
        &[(20240102, vec![bar(20240102, 2024, 1, 2, 0, 10_000)])],
        &[],
    )
    .unwrap();
    append_days(
        dir.path(),
        "RT5",
        2024,
        &[(20240102, vec![bar(20240102, 2024, 1, 2, 5, 10_100)])],
        &[20240102],
    )
    .unwrap();

    let bars = read_day(dir.path(), "RT5", 2024, 20240102).unwrap();
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].open_i, 10_100);
}

#[test]
fn metadata_tracks_present_and_no_data_dates_independently() {
    let dir = tempfile::tempdir().unwrap();
    append_days(
        dir.path(),
        "RT6",
        2024,
        &[(20240102, vec![bar(20240102, 2024, 1, 2, 0, 10_000)])],
        &[],
    )
    .unwrap();
    append_no_data_dates(dir.path(), "RT6", 2024, &[20240103, 20240104]).unwrap();

    let meta_path = metadata_path(dir.path(), "RT6", 2024);
    let meta = read_metadata(&meta_path).unwrap().unwrap();
    assert_eq!(meta.dates_present, vec![20240102]);
    assert_eq!(meta.no_data_dates, vec![20240103, 20240104]);
    assert_eq!(meta.bar_count_by_date[&20240102], 1);
}

#[test]
fn a_date_later_appended_with_real_data_is_removed_from_no_data_dates() {
    let dir = tempfile::tempdir().unwrap();
    append_no_data_dates(dir.path(), "RT7", 2024, &[20240105]).unwrap();
    append_days(
        dir.path(),
        "RT7",
        2024,
        &[(20240105, vec![bar(20240105, 2024, 1, 5, 0, 10_000)])],
        &[],
    )
    .unwrap();

    let meta_path = metadata_path(dir.path(), "RT7", 2024);
    let meta = read_metadata(&meta_path).unwrap().unwrap();
    assert!(meta.no_data_dates.is_empty());
    assert_eq!(meta.dates_present, vec![20240105]);
}

#[test]
fn no_data_only_append_never_creates_a_parquet_file() {
    let dir = tempfile::tempdir().unwrap();
    append_no_data_dates(dir.path(), "RT8", 2024, &[20240106]).unwrap();
    assert!(!year_file_path(dir.path(), "RT8", 2024).exists());
}

#[test]
fn reading_an_absent_date_in_an_existing_year_file_errors() {
    let dir = tempfile::tempdir().unwrap();
    append_days(
        dir.path(),
        "RT9",
        2024,
        &[(20240102, vec![bar(20240102, 2024, 1, 2, 0, 10_000)])],
        &[],
    )
    .unwrap();
    let err = read_day(dir.path(), "RT9", 2024, 20240105).unwrap_err();
    assert!(matches!(
        err,
        footprint_engine::StoreError::DateNotFound { .. }
    ));
}
