pub mod user;
pub mod alert;
pub mod alert_log;
pub mod market;

pub use user::User;
pub use alert::{Alert, AlertStatus, ThresholdKind};
pub use alert_log::AlertLog;
pub use market::{MarketSummary, PriceBar};
