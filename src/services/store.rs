use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    Database,
};

use crate::{
    error::AlarmError,
    models::{Alert, AlertLog, AlertStatus, User},
};

/// What the alert checker needs from persistence.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn active_alerts(&self) -> Result<Vec<Alert>, AlarmError>;

    async fn find_user(&self, user_id: ObjectId) -> Result<Option<User>, AlarmError>;

    /// Appends `log` and moves the alert's base price to `log.current_price`.
    async fn record_trigger(&self, log: &AlertLog) -> Result<(), AlarmError>;
}

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AlertStore for MongoStore {
    async fn active_alerts(&self) -> Result<Vec<Alert>, AlarmError> {
        let alerts = self.db.collection::<Alert>("alerts");

        let mut cursor = alerts
            .find(doc! { "status": AlertStatus::Active.as_str() }, None)
            .await?;

        let mut items: Vec<Alert> = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?);
        }

        Ok(items)
    }

    async fn find_user(&self, user_id: ObjectId) -> Result<Option<User>, AlarmError> {
        let users = self.db.collection::<User>("users");
        Ok(users.find_one(doc! { "_id": user_id }, None).await?)
    }

    async fn record_trigger(&self, log: &AlertLog) -> Result<(), AlarmError> {
        let logs = self.db.collection::<AlertLog>("alert_logs");
        let alerts = self.db.collection::<Alert>("alerts");

        // log before the rebase
        logs.insert_one(log, None).await?;

        alerts
            .update_one(
                doc! { "_id": log.alert_id },
                doc! { "$set": { "base_price": log.current_price } },
                None,
            )
            .await?;

        Ok(())
    }
}
