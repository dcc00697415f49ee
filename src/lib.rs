//! Library entrypoint for Stock Alarm.
//!
//! The binary in `main.rs` is a thin CLI over this crate; integration tests
//! under `tests/` drive the services here with in-memory collaborators.

pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod services;
pub mod templates;

use std::{path::Path, sync::Arc, time::Duration};

use mongodb::Client;

use crate::{
    services::{
        alert_check::AlertChecker,
        llm::{CommentaryGenerator, CompletionBackend, OpenAiClient, RetryPolicy},
        mail::GmailNotifier,
        naver::NaverClient,
        store::MongoStore,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub hbs: templates::Hbs,
    pub db: mongodb::Database,
    pub settings: config::Settings,
    pub naver: NaverClient,
    pub notifier: GmailNotifier,
}

impl AppState {
    pub async fn connect(settings: config::Settings) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(&settings.mongodb_uri).await?;
        let db = client.database(&settings.mongodb_db);
        services::db_init::ensure_indexes(&db).await?;

        let hbs = templates::build_handlebars(Path::new(&settings.prompt_template_path))?;
        let naver = NaverClient::new(Duration::from_secs(settings.naver_timeout_secs))?;
        let notifier = GmailNotifier::new(hbs.clone(), &settings);

        Ok(Self {
            hbs,
            db,
            settings,
            naver,
            notifier,
        })
    }

    pub fn commentary(&self) -> CommentaryGenerator {
        let backend: Option<Arc<dyn CompletionBackend>> = match &self.settings.openai_api_key {
            Some(key) => match OpenAiClient::new(key.clone(), self.settings.openai_model.clone()) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::error!(error = %e, "OpenAI client setup failed, commentary disabled");
                    None
                }
            },
            None => None,
        };

        CommentaryGenerator::new(self.hbs.clone(), backend, RetryPolicy::default())
    }

    pub fn alert_checker(&self) -> AlertChecker {
        AlertChecker::new(
            Arc::new(MongoStore::new(self.db.clone())),
            Arc::new(self.naver.clone()),
            self.commentary(),
            Arc::new(self.notifier.clone()),
            self.settings.base_url.clone(),
        )
    }
}
