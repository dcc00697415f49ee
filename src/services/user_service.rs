use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId};
use uuid::Uuid;

use crate::{error::AlarmError, models::User, AppState};

use super::mail::Notifier;

pub fn settings_url(base_url: &str, token: &str) -> String {
    format!("{}/settings/{}", base_url.trim_end_matches('/'), token)
}

fn normalize_email(email: &str) -> Result<String, AlarmError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AlarmError::validation("email", format!("not an email address: {email:?}"))),
    }
}

pub async fn find_by_token(state: &AppState, token: &str) -> Result<User, AlarmError> {
    let users = state.db.collection::<User>("users");
    users
        .find_one(doc! { "token": token.trim() }, None)
        .await?
        .ok_or_else(|| AlarmError::UserNotFound(token.to_string()))
}

/// Creates the user if the email is new and (re)sends the settings link.
/// Registering an existing email re-issues the link for the same token.
pub async fn register(
    state: &AppState,
    notifier: &dyn Notifier,
    email: &str,
) -> Result<(User, bool), AlarmError> {
    let email = normalize_email(email)?;
    let users = state.db.collection::<User>("users");

    let user = match users.find_one(doc! { "email": &email }, None).await? {
        Some(existing) => existing,
        None => {
            let user = User {
                id: ObjectId::new(),
                email: email.clone(),
                token: Uuid::new_v4().to_string(),
                created_at: Utc::now().timestamp(),
            };
            users.insert_one(&user, None).await?;
            tracing::info!(user_id = %user.id, email = %user.email, "user registered");
            user
        }
    };

    let url = settings_url(&state.settings.base_url, &user.token);
    let sent = notifier.send_welcome_email(&user.email, &url).await;

    Ok((user, sent))
}
