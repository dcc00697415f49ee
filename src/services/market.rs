use async_trait::async_trait;

use crate::models::{MarketSummary, PriceBar};

/// Price and index lookups. Every failure collapses to `None`; callers decide
/// how to degrade.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn current_price(&self, stock_code: &str) -> Option<f64>;

    async fn market_summary(&self) -> Option<MarketSummary>;

    /// Daily bars covering the last `days` calendar days, oldest first.
    async fn history(&self, stock_code: &str, days: i64) -> Option<Vec<PriceBar>>;
}
