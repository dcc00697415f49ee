use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::ThresholdKind;

/// One row per triggering evaluation. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertLog {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub alert_id: ObjectId,
    pub user_id: ObjectId,
    pub stock_code: String,

    // base price before the rebase
    pub base_price: f64,
    pub current_price: f64,
    pub change_rate: f64,
    pub threshold_type: ThresholdKind,

    pub email_sent: bool,
    pub sent_at: i64,
}
