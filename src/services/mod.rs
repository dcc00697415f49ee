pub mod naver;
pub mod market;
pub mod db_init;
pub mod store;

pub mod threshold;
pub mod llm;
pub mod mail;
pub mod alert_check;
pub mod alerts_service;
pub mod user_service;
