use std::fmt;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Inactive,
    // never set by the checker, triggered alerts rebase and stay active
    Triggered,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Inactive => "inactive",
            AlertStatus::Triggered => "triggered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdKind {
    Upper,
    Lower,
}

impl ThresholdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdKind::Upper => "upper",
            ThresholdKind::Lower => "lower",
        }
    }

    /// Direction word used in prompts and mail.
    pub fn label(&self) -> &'static str {
        match self {
            ThresholdKind::Upper => "상승",
            ThresholdKind::Lower => "하락",
        }
    }
}

impl fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub stock_code: String,
    pub stock_name: String,

    pub base_price: f64,

    // percent, positive
    #[serde(default)]
    pub threshold_upper: Option<f64>,
    // percent, stored negative
    #[serde(default)]
    pub threshold_lower: Option<f64>,

    pub status: AlertStatus,

    // reserved for later
    #[serde(default)]
    pub triggered_at: Option<i64>,
    pub created_at: i64,
}

impl Alert {
    pub fn threshold_for(&self, kind: ThresholdKind) -> Option<f64> {
        match kind {
            ThresholdKind::Upper => self.threshold_upper,
            ThresholdKind::Lower => self.threshold_lower,
        }
    }
}
