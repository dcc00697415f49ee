use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as Days, Local, NaiveDate};
use reqwest::Client;
use serde_json::Value;

use crate::models::{MarketSummary, PriceBar};

use super::market::MarketData;

const BASE_URL: &str = "https://m.stock.naver.com/api";
pub const MAX_HISTORY_DAYS: i64 = 1000;

#[derive(Clone)]
pub struct NaverClient {
    http: Client,
    base_url: String,
}

impl NaverClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_base_url(BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, String> {
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("Naver request failed: {status} {body}"));
        }

        res.json::<Value>().await.map_err(|e| e.to_string())
    }

    pub async fn stock_basic(&self, stock_code: &str) -> Result<f64, String> {
        let url = format!("{}/stock/{}/basic", self.base_url, stock_code);
        let data = self.get_json(&url, &[]).await?;

        parse_quote(&data)
    }

    pub async fn index_basic(&self, index: &str) -> Result<IndexQuote, String> {
        let url = format!("{}/index/{}/basic", self.base_url, index);
        let data = self.get_json(&url, &[]).await?;
        parse_index(&data)
    }

    pub async fn daily_prices(&self, stock_code: &str, days: i64) -> Result<Vec<PriceBar>, String> {
        let url = format!("{}/stock/{}/price", self.base_url, stock_code);
        let days = days.clamp(1, MAX_HISTORY_DAYS);
        let data = self
            .get_json(&url, &[("pageSize", days.to_string()), ("page", "1".to_string())])
            .await?;

        parse_history(&data, history_start(Local::now().date_naive(), days))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexQuote {
    pub close: f64,
    pub change: f64,
    pub change_rate: f64,
}

/// Accepts a JSON number or a string with thousands separators.
pub fn parse_price(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Current price from a `/stock/{code}/basic` payload. Zero or negative
/// quotes are rejected.
pub fn parse_quote(data: &Value) -> Result<f64, String> {
    let price = match data.get("closePrice") {
        None | Some(Value::Null) => return Err(format!("closePrice missing in {data}")),
        Some(v) => parse_price(v).ok_or_else(|| format!("closePrice not a number: {v}"))?,
    };

    if price <= 0.0 {
        return Err(format!("closePrice not positive: {price}"));
    }
    Ok(price)
}

/// First day of a `days`-long window ending `today`. `days` is clamped to
/// `1..=MAX_HISTORY_DAYS`.
pub fn history_start(today: NaiveDate, days: i64) -> NaiveDate {
    let days = days.clamp(1, MAX_HISTORY_DAYS);
    today
        .checked_sub_signed(Days::days(days))
        .unwrap_or(NaiveDate::MIN)
}

// absent fields read as zero, present-but-garbage fields are an error
fn field_or_zero(data: &Value, key: &str) -> Result<f64, String> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(0.0),
        Some(v) => parse_price(v).ok_or_else(|| format!("{key} not a number: {v}")),
    }
}

pub fn parse_index(data: &Value) -> Result<IndexQuote, String> {
    Ok(IndexQuote {
        close: field_or_zero(data, "closePrice")?,
        change: field_or_zero(data, "compareToPreviousClosePrice")?,
        change_rate: field_or_zero(data, "fluctuationsRatio")?,
    })
}

/// Rows on or after `since`, oldest first. Rows that do not parse are dropped.
pub fn parse_history(data: &Value, since: NaiveDate) -> Result<Vec<PriceBar>, String> {
    let rows = data
        .as_array()
        .ok_or_else(|| "price history is not an array".to_string())?;

    let mut bars: Vec<PriceBar> = rows
        .iter()
        .filter_map(parse_bar)
        .filter(|bar| bar.date >= since)
        .collect();
    bars.sort_by_key(|bar| bar.date);

    Ok(bars)
}

fn parse_bar(row: &Value) -> Option<PriceBar> {
    let raw_date = row.get("localTradedAt")?.as_str()?;
    let date = NaiveDate::parse_from_str(raw_date.get(..10)?, "%Y-%m-%d").ok()?;

    let volume = row
        .get("accumulatedTradingVolume")
        .and_then(parse_price)
        .unwrap_or(0.0);

    Some(PriceBar {
        date,
        open: parse_price(row.get("openPrice")?)?,
        high: parse_price(row.get("highPrice")?)?,
        low: parse_price(row.get("lowPrice")?)?,
        close: parse_price(row.get("closePrice")?)?,
        volume: volume.max(0.0) as u64,
    })
}

#[async_trait]
impl MarketData for NaverClient {
    async fn current_price(&self, stock_code: &str) -> Option<f64> {
        match self.stock_basic(stock_code).await {
            Ok(price) => Some(price),
            Err(e) => {
                tracing::error!(stock_code, error = %e, "current price lookup failed");
                None
            }
        }
    }

    async fn market_summary(&self) -> Option<MarketSummary> {
        let kospi = self.index_basic("KOSPI").await;
        let kosdaq = self.index_basic("KOSDAQ").await;

        match (kospi, kosdaq) {
            (Ok(kospi), Ok(kosdaq)) => Some(MarketSummary {
                kospi: kospi.close,
                kosdaq: kosdaq.close,
                kospi_change: kospi.change,
                kosdaq_change: kosdaq.change,
                kospi_change_rate: kospi.change_rate,
                kosdaq_change_rate: kosdaq.change_rate,
            }),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "market summary lookup failed");
                None
            }
        }
    }

    async fn history(&self, stock_code: &str, days: i64) -> Option<Vec<PriceBar>> {
        match self.daily_prices(stock_code, days).await {
            Ok(bars) if !bars.is_empty() => Some(bars),
            Ok(_) => {
                tracing::warn!(stock_code, days, "price history empty");
                None
            }
            Err(e) => {
                tracing::error!(stock_code, days, error = %e, "price history lookup failed");
                None
            }
        }
    }
}
