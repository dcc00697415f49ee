use std::sync::LazyLock;

use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use regex::Regex;

use crate::{
    error::AlarmError,
    models::{Alert, AlertLog, AlertStatus},
    AppState,
};

static STOCK_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}$").expect("stock code pattern"));

pub fn is_valid_stock_code(code: &str) -> bool {
    STOCK_CODE.is_match(code.trim())
}

/// Checks thresholds as entered by a user and returns them in stored form:
/// upper positive, lower negative.
pub fn normalize_thresholds(
    upper: Option<f64>,
    lower: Option<f64>,
) -> Result<(Option<f64>, Option<f64>), AlarmError> {
    if upper.is_none() && lower.is_none() {
        return Err(AlarmError::validation(
            "threshold",
            "set at least one of the upper or lower threshold",
        ));
    }

    if let Some(up) = upper {
        if !up.is_finite() || up <= 0.0 {
            return Err(AlarmError::validation("threshold_upper", format!("must be above 0, got {up}")));
        }
    }

    let lower = match lower {
        Some(low) if !low.is_finite() || low == 0.0 => {
            return Err(AlarmError::validation("threshold_lower", format!("must be non-zero, got {low}")));
        }
        Some(low) => Some(-low.abs()),
        None => None,
    };

    Ok((upper, lower))
}

pub struct NewAlert<'a> {
    pub stock_code: &'a str,
    pub stock_name: &'a str,
    pub base_price: f64,
    pub threshold_upper: Option<f64>,
    pub threshold_lower: Option<f64>,
}

pub fn build_alert(user_id: ObjectId, new: &NewAlert<'_>, now: i64) -> Result<Alert, AlarmError> {
    let code = new.stock_code.trim();
    if !is_valid_stock_code(code) {
        return Err(AlarmError::validation("stock_code", format!("expected 6 digits, got {code:?}")));
    }

    let name = new.stock_name.trim();
    if name.is_empty() {
        return Err(AlarmError::validation("stock_name", "must not be empty"));
    }

    if !new.base_price.is_finite() || new.base_price <= 0.0 {
        return Err(AlarmError::InvalidBaseline(new.base_price));
    }

    let (threshold_upper, threshold_lower) =
        normalize_thresholds(new.threshold_upper, new.threshold_lower)?;

    Ok(Alert {
        id: ObjectId::new(),
        user_id,
        stock_code: code.to_string(),
        stock_name: name.to_string(),
        base_price: new.base_price,
        threshold_upper,
        threshold_lower,
        status: AlertStatus::Active,
        triggered_at: None,
        created_at: now,
    })
}

pub async fn create_alert(state: &AppState, user_id: ObjectId, new: &NewAlert<'_>) -> Result<Alert, AlarmError> {
    let alert = build_alert(user_id, new, Utc::now().timestamp())?;

    let alerts = state.db.collection::<Alert>("alerts");
    alerts.insert_one(&alert, None).await?;

    tracing::info!(
        alert_id = %alert.id,
        stock_code = %alert.stock_code,
        base_price = alert.base_price,
        "alert created"
    );

    Ok(alert)
}

pub async fn list_alert_logs(state: &AppState, alert_id: ObjectId) -> Result<Vec<AlertLog>, AlarmError> {
    let logs = state.db.collection::<AlertLog>("alert_logs");
    let find_opts = FindOptions::builder().sort(doc! { "sent_at": -1 }).build();

    let mut cursor = logs.find(doc! { "alert_id": alert_id }, find_opts).await?;

    let mut items: Vec<AlertLog> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res?);
    }

    Ok(items)
}

/// Older alerts stored `threshold_lower` as a positive number. Flips them to
/// the negative form the evaluator expects. Returns the alerts that needed it.
pub async fn migrate_threshold_lower(state: &AppState, dry_run: bool) -> Result<Vec<Alert>, AlarmError> {
    let alerts = state.db.collection::<Alert>("alerts");

    let mut cursor = alerts
        .find(doc! { "threshold_lower": { "$gt": 0.0 } }, None)
        .await?;

    let mut found: Vec<Alert> = Vec::new();
    while let Some(res) = cursor.next().await {
        found.push(res?);
    }

    for alert in &found {
        let Some(old) = alert.threshold_lower else {
            continue;
        };
        let new = -old;
        tracing::info!(alert_id = %alert.id, stock_name = %alert.stock_name, old, new, dry_run, "threshold_lower sign flip");

        if !dry_run {
            alerts
                .update_one(
                    doc! { "_id": alert.id },
                    doc! { "$set": { "threshold_lower": new } },
                    None,
                )
                .await?;
        }
    }

    Ok(found)
}
