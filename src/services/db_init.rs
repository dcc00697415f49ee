use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

use crate::error::AlarmError;

pub async fn ensure_indexes(db: &Database) -> Result<(), AlarmError> {
    // users: unique email, unique token
    {
        let col = db.collection::<mongodb::bson::Document>("users");
        for key in ["email", "token"] {
            let model = IndexModel::builder()
                .keys(doc! { key: 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build();

            col.create_index(model, None).await?;
        }
    }

    // alerts: checker scans by status
    {
        let col = db.collection::<mongodb::bson::Document>("alerts");
        let model = IndexModel::builder()
            .keys(doc! { "status": 1, "stock_code": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // alert_logs: per-alert history, newest first
    {
        let col = db.collection::<mongodb::bson::Document>("alert_logs");
        let model = IndexModel::builder()
            .keys(doc! { "alert_id": 1, "sent_at": -1 })
            .build();

        col.create_index(model, None).await?;
    }

    Ok(())
}
