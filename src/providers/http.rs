//! Reference `reqwest`-backed provider. Parameterized by a URL template
//! rather than a fixed vendor endpoint, since the fetch contract ([`super::source`])
//! is generic; wire in a concrete feed by constructing one of these with
//! its URL shape.

use super::source::{MinuteBar, MinuteBarSource, PriceMode, ProviderError, RollMapping, SecondDataSource};
use crate::core::types::{Ohlc, SecondRecord};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawSecond {
    time: String,
    trade_open: f64,
    trade_high: f64,
    trade_low: f64,
    trade_close: f64,
    volume: f64,
    bid_open: f64,
    bid_high: f64,
    bid_low: f64,
    bid_close: f64,
    ask_open: f64,
    ask_high: f64,
    ask_low: f64,
    ask_close: f64,
}

#[derive(Debug, Deserialize)]
struct RawMinuteBar {
    time: String,
    open: f64,
    volume: f64,
}

fn parse_time(raw: &str) -> Result<NaiveDateTime, ProviderError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map_err(|e| ProviderError::Parse {
        reason: format!("bad timestamp {raw}: {e}"),
    })
}

fn to_second_record(raw: &RawSecond) -> Result<Option<SecondRecord>, ProviderError> {
    if raw.volume <= 0.0 {
        return Ok(None);
    }
    Ok(Some(SecondRecord {
        time: parse_time(&raw.time)?,
        trade: Ohlc::new(raw.trade_open, raw.trade_high, raw.trade_low, raw.trade_close),
        volume: raw.volume.round() as i64,
        bid: Ohlc::new(raw.bid_open, raw.bid_high, raw.bid_low, raw.bid_close),
        ask: Ohlc::new(raw.ask_open, raw.ask_high, raw.ask_low, raw.ask_close),
    }))
}

/// Reference `SecondDataSource`/`MinuteBarSource` implementation over
/// HTTP(S). `{symbol}`, `{date}`, `{start}`, `{end}` placeholders in the
/// templates are substituted with `YYYY-MM-DD` values.
pub struct HttpSecondDataSource {
    client: reqwest::Client,
    seconds_url_template: String,
    minutes_url_template: String,
}

impl HttpSecondDataSource {
    pub fn new(seconds_url_template: impl Into<String>, minutes_url_template: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            seconds_url_template: seconds_url_template.into(),
            minutes_url_template: minutes_url_template.into(),
        }
    }
}

#[async_trait]
impl SecondDataSource for HttpSecondDataSource {
    async fn fetch_day(
        &self,
        symbol: &str,
        date: NaiveDate,
        mode: PriceMode,
        roll: RollMapping,
    ) -> Result<Vec<SecondRecord>, ProviderError> {
        let PriceMode::Raw = mode;
        let _ = roll;

        let url = self
            .seconds_url_template
            .replace("{symbol}", symbol)
            .replace("{date}", &date.format("%Y-%m-%d").to_string());

        let resp = self.client.get(&url).send().await?.error_for_status()?;
        let raw: Vec<RawSecond> = resp.json().await?;

        let mut out = Vec::with_capacity(raw.len());
        for r in &raw {
            if let Some(record) = to_second_record(r)? {
                out.push(record);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl MinuteBarSource for HttpSecondDataSource {
    async fn fetch_minute_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<MinuteBar>, ProviderError> {
        let url = self
            .minutes_url_template
            .replace("{symbol}", symbol)
            .replace("{start}", &start_date.format("%Y-%m-%d").to_string())
            .replace("{end}", &end_date.format("%Y-%m-%d").to_string());

        let resp = self.client.get(&url).send().await?.error_for_status()?;
        let raw: Vec<RawMinuteBar> = resp.json().await?;

        raw.iter()
            .map(|r| {
                Ok(MinuteBar {
                    time: parse_time(&r.time)?,
                    open: r.open,
                    volume: r.volume,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_volume_second_is_dropped() {
        let raw = RawSecond {
            time: "2024-01-02T09:30:00".into(),
            trade_open: 1.0,
            trade_high: 1.0,
            trade_low: 1.0,
            trade_close: 1.0,
            volume: 0.0,
            bid_open: 1.0,
            bid_high: 1.0,
            bid_low: 1.0,
            bid_close: 1.0,
            ask_open: 1.0,
            ask_high: 1.0,
            ask_low: 1.0,
            ask_close: 1.0,
        };
        assert!(to_second_record(&raw).unwrap().is_none());
    }

    #[test]
    fn test_valid_second_parses() {
        let raw = RawSecond {
            time: "2024-01-02T09:30:00".into(),
            trade_open: 100.0,
            trade_high: 101.0,
            trade_low: 99.0,
            trade_close: 100.5,
            volume: 42.0,
            bid_open: 99.9,
            bid_high: 100.9,
            bid_low: 98.9,
            bid_close: 100.4,
            ask_open: 100.1,
            ask_high: 101.1,
            ask_low: 99.1,
            ask_close: 100.6,
        };
        let record = to_second_record(&raw).unwrap().unwrap();
        assert_eq!(record.volume, 42);
        assert_eq!(record.trade.open, 100.0);
    }

    #[test]
    fn test_malformed_timestamp_is_rejected() {
        let raw = RawSecond {
            time: "not-a-time".into(),
            trade_open: 1.0,
            trade_high: 1.0,
            trade_low: 1.0,
            trade_close: 1.0,
            volume: 1.0,
            bid_open: 1.0,
            bid_high: 1.0,
            bid_low: 1.0,
            bid_close: 1.0,
            ask_open: 1.0,
            ask_high: 1.0,
            ask_low: 1.0,
            ask_close: 1.0,
        };
        assert!(matches!(
            to_second_record(&raw),
            Err(ProviderError::Parse { .. })
        ));
    }
}
