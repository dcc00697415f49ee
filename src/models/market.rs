use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// KOSPI / KOSDAQ snapshot. `Default` is the all-zero stand-in used when the
/// index endpoints are unreachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub kospi: f64,
    pub kosdaq: f64,
    pub kospi_change: f64,
    pub kosdaq_change: f64,
    pub kospi_change_rate: f64,
    pub kosdaq_change_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}
