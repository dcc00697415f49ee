use chrono::DateTime;
use clap::{Parser, Subcommand};
use mongodb::bson::oid::ObjectId;
use tracing_subscriber::EnvFilter;

use stock_alarm::{
    config,
    format::{fmt2, thousands},
    services::{
        alerts_service::{self, NewAlert},
        market::MarketData,
        user_service,
    },
    AppState,
};

#[derive(Parser)]
#[command(name = "stock-alarm", about = "Price-change alerts for KRX stocks")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check every active alert once and mail the ones that fired (default)
    Check,
    /// Register an email address and send its settings link
    Register {
        #[arg(long)]
        email: String,
    },
    /// Add an alert for the user owning TOKEN
    AddAlert {
        #[arg(long)]
        token: String,
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        /// Defaults to the current price
        #[arg(long)]
        base_price: Option<f64>,
        /// Percent rise that fires the alert
        #[arg(long)]
        upper: Option<f64>,
        /// Percent drop that fires the alert (sign is ignored)
        #[arg(long, allow_negative_numbers = true)]
        lower: Option<f64>,
    },
    /// Flip legacy positive lower thresholds to negative
    MigrateThresholds {
        #[arg(long)]
        dry_run: bool,
    },
    /// Print daily prices for a stock
    History {
        code: String,
        #[arg(long, default_value_t = 90)]
        days: i64,
    },
    /// Print the trigger log of one alert
    Logs { alert_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = config::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    let cli = Cli::parse();
    let state = AppState::connect(settings).await?;

    match cli.command.unwrap_or(Command::Check) {
        Command::Check => {
            let summary = state.alert_checker().run().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Register { email } => {
            let (user, sent) = user_service::register(&state, &state.notifier, &email).await?;
            println!("{} -> {}", user.email, user_service::settings_url(&state.settings.base_url, &user.token));
            if !sent {
                tracing::warn!(email = %user.email, "welcome mail was not delivered");
            }
        }
        Command::AddAlert {
            token,
            code,
            name,
            base_price,
            upper,
            lower,
        } => {
            let user = user_service::find_by_token(&state, &token).await?;
            let base_price = match base_price {
                Some(p) => p,
                None => state
                    .naver
                    .current_price(&code)
                    .await
                    .ok_or_else(|| anyhow::anyhow!("no current price for {code}, pass --base-price"))?,
            };

            let alert = alerts_service::create_alert(
                &state,
                user.id,
                &NewAlert {
                    stock_code: &code,
                    stock_name: &name,
                    base_price,
                    threshold_upper: upper,
                    threshold_lower: lower,
                },
            )
            .await?;
            println!("{}", alert.id.to_hex());
        }
        Command::MigrateThresholds { dry_run } => {
            let changed = alerts_service::migrate_threshold_lower(&state, dry_run).await?;
            if changed.is_empty() {
                println!("nothing to migrate");
            }
            for alert in &changed {
                let old = alert.threshold_lower.unwrap_or_default();
                println!("{} ({}): {} -> {}", alert.id.to_hex(), alert.stock_name, old, -old);
            }
            if dry_run {
                println!("dry run, {} alert(s) left unchanged", changed.len());
            }
        }
        Command::History { code, days } => {
            let bars = state
                .naver
                .history(&code, days)
                .await
                .ok_or_else(|| anyhow::anyhow!("no price history for {code}"))?;
            for bar in bars {
                println!(
                    "{}  O {}  H {}  L {}  C {}  V {}",
                    bar.date,
                    thousands(bar.open, 0),
                    thousands(bar.high, 0),
                    thousands(bar.low, 0),
                    thousands(bar.close, 0),
                    bar.volume
                );
            }
        }
        Command::Logs { alert_id } => {
            let oid = ObjectId::parse_str(&alert_id)?;
            for log in alerts_service::list_alert_logs(&state, oid).await? {
                println!(
                    "{}  {}  {} -> {}  {}%  email_sent={}",
                    DateTime::from_timestamp(log.sent_at, 0)
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| log.sent_at.to_string()),
                    log.threshold_type,
                    thousands(log.base_price, 0),
                    thousands(log.current_price, 0),
                    fmt2(log.change_rate),
                    log.email_sent
                );
            }
        }
    }

    Ok(())
}
