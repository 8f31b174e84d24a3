//! Idempotent per-symbol backfill: enumerate the requested date range,
//! group by year, fetch and aggregate whatever is missing (or everything,
//! under `force_recompute`), and commit one year at a time.
//!
//! Per-date fetch and aggregation failures are logged and skipped — a bad
//! day never aborts the rest of the run (see the error taxonomy this
//! mirrors in [`crate::store::StoreError`] and [`crate::providers::ProviderError`]).
//! A single year aborts early after `max_consecutive_errors` fetch
//! failures in a row within that year, on the assumption the source
//! itself is down rather than the data being unavailable for a handful of
//! dates; every other year in the run still proceeds to completion.

use crate::core::aggregator::aggregate_day;
use crate::core::types::VBar;
use crate::providers::{PriceMode, ProviderError, RollMapping, SecondDataSource};
use crate::store::{self, StoreError};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct BackfillRequest {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub v_unit: i64,
    pub tick_size: f64,
    pub force_recompute: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BackfillReport {
    pub dates_processed: Vec<i32>,
    pub dates_skipped: Vec<i32>,
    pub dates_errored: Vec<i32>,
    pub had_fatal_error: bool,
}

fn yyyymmdd(d: NaiveDate) -> i32 {
    d.year() * 10_000 + d.month() as i32 * 100 + d.day() as i32
}

fn daterange_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut d = start;
    while d <= end {
        days.push(d);
        d += Duration::days(1);
    }
    days
}

pub struct Orchestrator<S: SecondDataSource> {
    source: S,
    data_root: PathBuf,
    max_consecutive_errors: u32,
}

impl<S: SecondDataSource> Orchestrator<S> {
    pub fn new(source: S, data_root: PathBuf, max_consecutive_errors: u32) -> Self {
        Self {
            source,
            data_root,
            max_consecutive_errors,
        }
    }

    pub async fn run(&self, req: &BackfillRequest) -> Result<BackfillReport, OrchestratorError> {
        let all_days = daterange_days(req.start_date, req.end_date);
        let mut by_year: BTreeMap<i32, Vec<NaiveDate>> = BTreeMap::new();
        for d in all_days {
            by_year.entry(d.year()).or_default().push(d);
        }

        let mut report = BackfillReport::default();

        for (year, days) in by_year {
            if self.run_year(req, year, &days, &mut report).await? {
                report.had_fatal_error = true;
            }
        }

        Ok(report)
    }

    /// Returns `Ok(true)` if the fetch source hit `max_consecutive_errors`
    /// while processing this year. Per-date fetch errors are otherwise
    /// isolated; a year that aborts for this reason still lets every
    /// other year in the run proceed.
    async fn run_year(
        &self,
        req: &BackfillRequest,
        year: i32,
        days: &[NaiveDate],
        report: &mut BackfillReport,
    ) -> Result<bool, OrchestratorError> {
        let targets: Vec<i32> = days.iter().map(|d| yyyymmdd(*d)).collect();
        let meta_path = store::metadata_path(&self.data_root, &req.symbol, year);
        let meta = store::read_metadata(&meta_path)?.unwrap_or_default();
        let missing = store::detect_missing_dates(
            &meta.present_set(),
            &meta.no_data_set(),
            &targets,
            req.force_recompute,
        );

        if missing.is_empty() && !req.force_recompute {
            return Ok(false);
        }
        let missing_set: BTreeSet<i32> = missing.iter().copied().collect();

        let mut day_frames: Vec<(i32, Vec<VBar>)> = Vec::new();
        let mut no_data_dates: Vec<i32> = Vec::new();
        let mut consecutive_errors = 0u32;

        for day in days {
            let trade_date = yyyymmdd(*day);
            if !req.force_recompute && !missing_set.contains(&trade_date) {
                continue;
            }

            match self
                .source
                .fetch_day(&req.symbol, *day, PriceMode::Raw, RollMapping::OpenInterestAnnual)
                .await
            {
                Ok(mut seconds) => {
                    consecutive_errors = 0;
                    // Defensive parity with the cross-midnight guard: a
                    // second whose date doesn't match the requested day
                    // (a provider returning spillover rows) never
                    // contributes volume to this day's bars.
                    for s in seconds.iter_mut() {
                        if s.time.date() != *day {
                            s.volume = 0;
                        }
                    }

                    if seconds.is_empty() {
                        no_data_dates.push(trade_date);
                        report.dates_skipped.push(trade_date);
                        continue;
                    }

                    match aggregate_day(&seconds, req.v_unit, req.tick_size) {
                        Ok(bars) => {
                            day_frames.push((trade_date, bars));
                            report.dates_processed.push(trade_date);
                        }
                        Err(e) => {
                            tracing::warn!(
                                symbol = %req.symbol,
                                trade_date,
                                error = %e,
                                "aggregation failed, skipping date"
                            );
                            report.dates_errored.push(trade_date);
                        }
                    }
                }
                Err(e) => self.handle_fetch_error(req, trade_date, e, &mut consecutive_errors, report),
            }

            if consecutive_errors >= self.max_consecutive_errors {
                self.commit_year(req, year, &day_frames, &no_data_dates, &missing)?;
                return Ok(true);
            }
        }

        self.commit_year(req, year, &day_frames, &no_data_dates, &missing)?;
        Ok(false)
    }

    fn handle_fetch_error(
        &self,
        req: &BackfillRequest,
        trade_date: i32,
        error: ProviderError,
        consecutive_errors: &mut u32,
        report: &mut BackfillReport,
    ) {
        *consecutive_errors += 1;
        tracing::warn!(symbol = %req.symbol, trade_date, error = %error, "fetch failed, skipping date");
        report.dates_errored.push(trade_date);
    }

    fn commit_year(
        &self,
        req: &BackfillRequest,
        year: i32,
        day_frames: &[(i32, Vec<VBar>)],
        no_data_dates: &[i32],
        missing: &[i32],
    ) -> Result<(), OrchestratorError> {
        if !no_data_dates.is_empty() {
            store::append_no_data_dates(&self.data_root, &req.symbol, year, no_data_dates)?;
        }
        if !day_frames.is_empty() {
            store::append_days(&self.data_root, &req.symbol, year, day_frames, missing)?;
        }
        Ok(())
    }
}

/// Runs several independent backfill requests against the same
/// orchestrator concurrently. Each request is an independent unit of
/// work — per-symbol ordering within [`Orchestrator::run`] is still
/// sequential; this only overlaps the network-bound waiting across
/// units that don't share a year file.
pub async fn run_many<S>(
    orchestrator: &Orchestrator<S>,
    jobs: Vec<BackfillRequest>,
) -> Vec<Result<BackfillReport, OrchestratorError>>
where
    S: SecondDataSource + Sync,
{
    let futures = jobs.iter().map(|job| orchestrator.run(job));
    futures::future::join_all(futures).await
}
