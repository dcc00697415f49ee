use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use chrono::Utc;
use futures_util::FutureExt;
use mongodb::bson::{oid::ObjectId, serde_helpers::serialize_object_id_as_hex_string};
use serde::Serialize;

use crate::{
    error::AlarmError,
    models::{Alert, AlertLog, ThresholdKind},
};

use super::{
    llm::{fallback_comment, CommentaryGenerator, CommentaryRequest},
    mail::{AlertEmail, Notifier},
    market::MarketData,
    store::AlertStore,
    threshold,
    user_service::settings_url,
};

pub const PRICE_FETCH_FAILED: &str = "price fetch failed";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlertOutcome {
    Skipped { reason: String },
    NotTriggered { change_rate: f64 },
    Triggered {
        kind: ThresholdKind,
        change_rate: f64,
        email_sent: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertError {
    #[serde(serialize_with = "serialize_object_id_as_hex_string")]
    pub alert_id: ObjectId,
    pub stock_code: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckSummary {
    pub total: usize,
    pub checked: usize,
    pub triggered: usize,
    pub email_sent: usize,
    pub email_failed: usize,
    pub errors: Vec<AlertError>,
}

impl CheckSummary {
    fn record(&mut self, alert: &Alert, outcome: &AlertOutcome) {
        self.checked += 1;
        match outcome {
            AlertOutcome::Skipped { reason } => self.errors.push(AlertError {
                alert_id: alert.id,
                stock_code: alert.stock_code.clone(),
                error: reason.clone(),
            }),
            AlertOutcome::NotTriggered { .. } => {}
            AlertOutcome::Triggered { email_sent, .. } => {
                self.triggered += 1;
                if *email_sent {
                    self.email_sent += 1;
                } else {
                    self.email_failed += 1;
                }
            }
        }
    }

    fn record_error(&mut self, alert: &Alert, error: &AlarmError) {
        self.errors.push(AlertError {
            alert_id: alert.id,
            stock_code: alert.stock_code.clone(),
            error: error.to_string(),
        });
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    match payload.downcast::<String>() {
        Ok(s) => *s,
        Err(_) => "unknown panic".to_string(),
    }
}

/// One pass over every active alert.
///
/// Alerts are handled one at a time. Whatever goes wrong with a single alert
/// ends up in [`CheckSummary::errors`]; only failing to load the alert list
/// aborts the run.
pub struct AlertChecker {
    store: Arc<dyn AlertStore>,
    market: Arc<dyn MarketData>,
    commentary: CommentaryGenerator,
    notifier: Arc<dyn Notifier>,
    base_url: String,
}

impl AlertChecker {
    pub fn new(
        store: Arc<dyn AlertStore>,
        market: Arc<dyn MarketData>,
        commentary: CommentaryGenerator,
        notifier: Arc<dyn Notifier>,
        base_url: String,
    ) -> Self {
        Self {
            store,
            market,
            commentary,
            notifier,
            base_url,
        }
    }

    pub async fn run(&self) -> Result<CheckSummary, AlarmError> {
        let alerts = self.store.active_alerts().await?;

        let mut summary = CheckSummary {
            total: alerts.len(),
            ..CheckSummary::default()
        };

        tracing::info!(total = summary.total, "alert check started");

        for alert in &alerts {
            let res = AssertUnwindSafe(self.process_alert(alert)).catch_unwind().await;

            match res {
                Ok(Ok(outcome)) => summary.record(alert, &outcome),
                Ok(Err(e)) => {
                    tracing::error!(alert_id = %alert.id, stock_code = %alert.stock_code, error = %e, "alert processing failed");
                    summary.record_error(alert, &e);
                }
                Err(payload) => {
                    let e = AlarmError::Panicked(panic_message(payload));
                    tracing::error!(alert_id = %alert.id, stock_code = %alert.stock_code, error = %e, "alert processing panicked");
                    summary.record_error(alert, &e);
                }
            }
        }

        tracing::info!(
            checked = summary.checked,
            triggered = summary.triggered,
            email_sent = summary.email_sent,
            email_failed = summary.email_failed,
            errors = summary.errors.len(),
            "alert check finished"
        );

        Ok(summary)
    }

    pub async fn process_alert(&self, alert: &Alert) -> Result<AlertOutcome, AlarmError> {
        let quote = self.market.current_price(&alert.stock_code).await;
        // zero or negative quotes are not prices
        let Some(current_price) = quote.filter(|p| p.is_finite() && *p > 0.0) else {
            tracing::error!(stock_code = %alert.stock_code, stock_name = %alert.stock_name, "current price unavailable, skipping");
            return Ok(AlertOutcome::Skipped {
                reason: PRICE_FETCH_FAILED.to_string(),
            });
        };

        tracing::debug!(stock_code = %alert.stock_code, current_price, "current price");

        let eval = threshold::evaluate(
            alert.base_price,
            current_price,
            alert.threshold_upper,
            alert.threshold_lower,
        )?;

        let Some(kind) = eval.kind else {
            tracing::debug!(
                stock_code = %alert.stock_code,
                change_rate = eval.change_rate,
                "threshold not reached"
            );
            return Ok(AlertOutcome::NotTriggered {
                change_rate: eval.change_rate,
            });
        };

        let threshold_value = alert.threshold_for(kind).unwrap_or_default();
        tracing::info!(
            stock_code = %alert.stock_code,
            stock_name = %alert.stock_name,
            change_rate = eval.change_rate,
            threshold = %kind,
            threshold_value,
            "threshold reached"
        );

        let user = self
            .store
            .find_user(alert.user_id)
            .await?
            .ok_or_else(|| AlarmError::UserNotFound(alert.user_id.to_hex()))?;

        let market = match self.market.market_summary().await {
            Some(m) => m,
            None => {
                tracing::warn!("market summary unavailable, using zeros");
                Default::default()
            }
        };

        let comment = self
            .commentary
            .generate(&CommentaryRequest {
                stock_name: &alert.stock_name,
                stock_code: &alert.stock_code,
                change_rate: eval.change_rate,
                kind,
                market: &market,
            })
            .await
            .unwrap_or_else(|| {
                tracing::warn!(stock_code = %alert.stock_code, "no commentary, using fallback comment");
                fallback_comment(&alert.stock_name, eval.change_rate, kind)
            });

        let url = settings_url(&self.base_url, &user.token);
        let email_sent = self
            .notifier
            .send_alert_email(&AlertEmail {
                recipient: &user.email,
                stock_name: &alert.stock_name,
                stock_code: &alert.stock_code,
                base_price: alert.base_price,
                current_price,
                change_rate: eval.change_rate,
                kind,
                threshold_value,
                market: &market,
                comment: &comment,
                settings_url: &url,
            })
            .await;

        if !email_sent {
            tracing::error!(recipient = %user.email, stock_code = %alert.stock_code, "alert mail not delivered");
        }

        let log = AlertLog {
            id: ObjectId::new(),
            alert_id: alert.id,
            user_id: alert.user_id,
            stock_code: alert.stock_code.clone(),
            base_price: alert.base_price,
            current_price,
            change_rate: eval.change_rate,
            threshold_type: kind,
            email_sent,
            sent_at: Utc::now().timestamp(),
        };
        self.store.record_trigger(&log).await?;

        Ok(AlertOutcome::Triggered {
            kind,
            change_rate: eval.change_rate,
            email_sent,
        })
    }
}
