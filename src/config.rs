use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,

    // used to build the settings link in outgoing mail
    pub base_url: String,

    pub gmail_address: Option<String>,
    pub gmail_app_password: Option<String>,
    pub mail_from_address: Option<String>,
    pub mail_from_name: String,

    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub prompt_template_path: String,

    pub naver_timeout_secs: u64,
    pub log_level: String,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB")
        .unwrap_or_else(|_| "stock_alarm".to_string());

    let base_url = env::var("BASE_URL")
        .map(|u| u.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| "https://stockalarm.co.kr".to_string());

    let naver_timeout_secs = env::var("NAVER_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(5);

    Settings {
        mongodb_uri,
        mongodb_db,
        base_url,
        gmail_address: optional("GMAIL_ADDRESS"),
        gmail_app_password: optional("GMAIL_APP_PASSWORD"),
        mail_from_address: optional("MAIL_FROM_ADDRESS"),
        mail_from_name: optional("MAIL_FROM_NAME").unwrap_or_else(|| "Stock Alarm".to_string()),
        openai_api_key: optional("OPENAI_API_KEY"),
        openai_model: optional("OPENAI_MODEL").unwrap_or_else(|| "gpt-5-nano".to_string()),
        prompt_template_path: optional("PROMPT_TEMPLATE_PATH")
            .unwrap_or_else(|| "prompts/alert_mail.hbs".to_string()),
        naver_timeout_secs,
        log_level: optional("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
    }
}
