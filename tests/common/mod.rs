#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use stock_alarm::{
    error::AlarmError,
    models::{Alert, AlertLog, AlertStatus, MarketSummary, PriceBar, User},
    services::{
        alert_check::AlertChecker,
        llm::{CommentaryGenerator, Completion, CompletionBackend, LlmError, RetryPolicy},
        mail::{AlertEmail, Notifier},
        market::MarketData,
        store::AlertStore,
    },
    templates::{self, Hbs},
};
use tokio::time::Instant;

pub const BASE_URL: &str = "https://stockalarm.test";

pub fn hbs() -> Hbs {
    templates::build_handlebars(Path::new("/nonexistent/alert_mail.hbs")).unwrap()
}

pub fn user(email: &str) -> User {
    User {
        id: ObjectId::new(),
        email: email.to_string(),
        token: format!("token-{email}"),
        created_at: 0,
    }
}

pub fn alert(user: &User, code: &str, base_price: f64, upper: Option<f64>, lower: Option<f64>) -> Alert {
    Alert {
        id: ObjectId::new(),
        user_id: user.id,
        stock_code: code.to_string(),
        stock_name: format!("종목{code}"),
        base_price,
        threshold_upper: upper,
        threshold_lower: lower,
        status: AlertStatus::Active,
        triggered_at: None,
        created_at: 0,
    }
}

pub fn sample_market() -> MarketSummary {
    MarketSummary {
        kospi: 2650.42,
        kosdaq: 845.67,
        kospi_change: 12.35,
        kosdaq_change: -3.21,
        kospi_change_rate: 0.47,
        kosdaq_change_rate: -0.38,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub alerts: Mutex<Vec<Alert>>,
    pub users: Mutex<Vec<User>>,
    pub logs: Mutex<Vec<AlertLog>>,
    pub fail_listing: bool,
}

impl MemoryStore {
    pub fn new(users: Vec<User>, alerts: Vec<Alert>) -> Self {
        Self {
            alerts: Mutex::new(alerts),
            users: Mutex::new(users),
            ..Default::default()
        }
    }

    pub fn alert(&self, id: ObjectId) -> Alert {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .unwrap()
    }

    pub fn logs_for(&self, id: ObjectId) -> Vec<AlertLog> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.alert_id == id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn active_alerts(&self) -> Result<Vec<Alert>, AlarmError> {
        if self.fail_listing {
            return Err(AlarmError::validation("store", "listing failed"));
        }
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.status == AlertStatus::Active)
            .cloned()
            .collect())
    }

    async fn find_user(&self, user_id: ObjectId) -> Result<Option<User>, AlarmError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == user_id).cloned())
    }

    async fn record_trigger(&self, log: &AlertLog) -> Result<(), AlarmError> {
        self.logs.lock().unwrap().push(log.clone());
        if let Some(a) = self.alerts.lock().unwrap().iter_mut().find(|a| a.id == log.alert_id) {
            a.base_price = log.current_price;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct StubMarket {
    pub prices: HashMap<String, f64>,
    pub summary: Option<MarketSummary>,
    // price lookups for this code panic
    pub panic_on: Option<String>,
    pub summary_calls: Mutex<usize>,
}

impl StubMarket {
    pub fn with_prices(prices: &[(&str, f64)]) -> Self {
        Self {
            prices: prices.iter().map(|(c, p)| (c.to_string(), *p)).collect(),
            summary: Some(sample_market()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl MarketData for StubMarket {
    async fn current_price(&self, stock_code: &str) -> Option<f64> {
        if self.panic_on.as_deref() == Some(stock_code) {
            panic!("quote feed exploded for {stock_code}");
        }
        self.prices.get(stock_code).copied()
    }

    async fn market_summary(&self) -> Option<MarketSummary> {
        *self.summary_calls.lock().unwrap() += 1;
        self.summary
    }

    async fn history(&self, _stock_code: &str, _days: i64) -> Option<Vec<PriceBar>> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub recipient: String,
    pub stock_code: String,
    pub base_price: f64,
    pub current_price: f64,
    pub threshold_value: f64,
    pub market: MarketSummary,
    pub comment: String,
    pub settings_url: String,
}

pub struct RecordingNotifier {
    pub deliver: bool,
    pub sent: Mutex<Vec<SentMail>>,
    pub welcomed: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new(deliver: bool) -> Self {
        Self {
            deliver,
            sent: Mutex::new(Vec::new()),
            welcomed: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_alert_email(&self, email: &AlertEmail<'_>) -> bool {
        self.sent.lock().unwrap().push(SentMail {
            recipient: email.recipient.to_string(),
            stock_code: email.stock_code.to_string(),
            base_price: email.base_price,
            current_price: email.current_price,
            threshold_value: email.threshold_value,
            market: *email.market,
            comment: email.comment.to_string(),
            settings_url: email.settings_url.to_string(),
        });
        self.deliver
    }

    async fn send_welcome_email(&self, recipient: &str, settings_url: &str) -> bool {
        self.welcomed
            .lock()
            .unwrap()
            .push((recipient.to_string(), settings_url.to_string()));
        self.deliver
    }
}

/// Replays canned completion results and records when each call happened.
#[derive(Default)]
pub struct ScriptedBackend {
    pub script: Mutex<VecDeque<Result<Completion, LlmError>>>,
    pub calls: Mutex<Vec<Instant>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<Completion, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub fn ok(text: &str) -> Result<Completion, LlmError> {
    Ok(Completion {
        content: text.to_string(),
        total_tokens: 42,
    })
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<Completion, LlmError> {
        self.calls.lock().unwrap().push(Instant::now());
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Unexpected("script exhausted".to_string())))
    }
}

pub fn generator(backend: Option<Arc<ScriptedBackend>>) -> CommentaryGenerator {
    let backend = backend.map(|b| b as Arc<dyn CompletionBackend>);
    CommentaryGenerator::new(hbs(), backend, RetryPolicy::default())
}

pub fn checker(
    store: Arc<MemoryStore>,
    market: Arc<StubMarket>,
    backend: Option<Arc<ScriptedBackend>>,
    notifier: Arc<RecordingNotifier>,
) -> AlertChecker {
    AlertChecker::new(store, market, generator(backend), notifier, BASE_URL.to_string())
}
