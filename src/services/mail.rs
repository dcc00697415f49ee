use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::json;

use crate::{
    config::Settings,
    error::AlarmError,
    format::{signed, thousands},
    models::{MarketSummary, ThresholdKind},
    templates::{Hbs, MAIL_ALERT, MAIL_WELCOME},
};

const SMTP_RELAY: &str = "smtp.gmail.com";

pub struct AlertEmail<'a> {
    pub recipient: &'a str,
    pub stock_name: &'a str,
    pub stock_code: &'a str,
    pub base_price: f64,
    pub current_price: f64,
    pub change_rate: f64,
    pub kind: ThresholdKind,
    pub threshold_value: f64,
    pub market: &'a MarketSummary,
    pub comment: &'a str,
    pub settings_url: &'a str,
}

/// Single-attempt mail delivery. `false` on any failure, never an error.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert_email(&self, email: &AlertEmail<'_>) -> bool;

    async fn send_welcome_email(&self, recipient: &str, settings_url: &str) -> bool;
}

/// Returns `(subject, body)`.
pub fn compose_alert_email(hbs: &Hbs, email: &AlertEmail<'_>) -> Result<(String, String), AlarmError> {
    let m = email.market;
    let direction = email.kind.label();

    let subject = format!(
        "[Stock Alarm] {} {} 알림 ({}%)",
        email.stock_name,
        direction,
        signed(email.change_rate, 2)
    );

    let ctx = json!({
        "stock_name": email.stock_name,
        "stock_code": email.stock_code,
        "direction": direction,
        "base_price": thousands(email.base_price, 0),
        "current_price": thousands(email.current_price, 0),
        "change_rate": signed(email.change_rate, 2),
        "threshold_value": signed(email.threshold_value, 1),
        "kospi": thousands(m.kospi, 2),
        "kosdaq": thousands(m.kosdaq, 2),
        "kospi_change": signed(m.kospi_change, 2),
        "kosdaq_change": signed(m.kosdaq_change, 2),
        "kospi_change_rate": signed(m.kospi_change_rate, 2),
        "kosdaq_change_rate": signed(m.kosdaq_change_rate, 2),
        "comment": email.comment,
        "settings_url": email.settings_url,
    });

    let body = hbs.render(MAIL_ALERT, &ctx)?;
    Ok((subject, body))
}

pub fn compose_welcome_email(hbs: &Hbs, settings_url: &str) -> Result<(String, String), AlarmError> {
    let subject = "[Stock Alarm] 설정 페이지 안내".to_string();
    let body = hbs.render(MAIL_WELCOME, &json!({ "settings_url": settings_url }))?;
    Ok((subject, body))
}

#[derive(Clone)]
pub struct GmailNotifier {
    hbs: Hbs,
    address: Option<String>,
    app_password: Option<String>,
    from_address: Option<String>,
    from_name: String,
}

impl GmailNotifier {
    pub fn new(hbs: Hbs, settings: &Settings) -> Self {
        Self {
            hbs,
            address: settings.gmail_address.clone(),
            app_password: settings.gmail_app_password.clone(),
            from_address: settings.mail_from_address.clone(),
            from_name: settings.mail_from_name.clone(),
        }
    }

    async fn deliver(&self, recipient: &str, subject: String, body: String) -> Result<(), String> {
        let (Some(address), Some(password)) = (&self.address, &self.app_password) else {
            return Err("GMAIL_ADDRESS / GMAIL_APP_PASSWORD are not configured".to_string());
        };

        let sender = self.from_address.as_deref().unwrap_or(address.as_str());
        let from = Mailbox::new(
            Some(self.from_name.clone()),
            sender
                .parse::<Address>()
                .map_err(|e| format!("bad sender address {sender}: {e}"))?,
        );
        let to = recipient
            .parse::<Mailbox>()
            .map_err(|e| format!("bad recipient address {recipient}: {e}"))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| e.to_string())?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(SMTP_RELAY)
            .map_err(|e| e.to_string())?
            .credentials(Credentials::new(address.clone(), password.clone()))
            .build();

        transport.send(message).await.map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for GmailNotifier {
    async fn send_alert_email(&self, email: &AlertEmail<'_>) -> bool {
        let (subject, body) = match compose_alert_email(&self.hbs, email) {
            Ok(parts) => parts,
            Err(e) => {
                tracing::error!(recipient = email.recipient, error = %e, "alert mail compose failed");
                return false;
            }
        };

        match self.deliver(email.recipient, subject, body).await {
            Ok(()) => {
                tracing::info!(recipient = email.recipient, stock_code = email.stock_code, "alert mail sent");
                true
            }
            Err(e) => {
                tracing::error!(recipient = email.recipient, stock_code = email.stock_code, error = %e, "alert mail failed");
                false
            }
        }
    }

    async fn send_welcome_email(&self, recipient: &str, settings_url: &str) -> bool {
        let (subject, body) = match compose_welcome_email(&self.hbs, settings_url) {
            Ok(parts) => parts,
            Err(e) => {
                tracing::error!(recipient, error = %e, "welcome mail compose failed");
                return false;
            }
        };

        match self.deliver(recipient, subject, body).await {
            Ok(()) => {
                tracing::info!(recipient, "welcome mail sent");
                true
            }
            Err(e) => {
                tracing::error!(recipient, error = %e, "welcome mail failed");
                false
            }
        }
    }
}
