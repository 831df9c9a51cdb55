use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde_json::Value;

use crate::entities::{crop_analyses, prelude::*};
use crate::models::analysis::AnalysisRecord;

/// Repository for crop analysis records
pub struct AnalysisRepository {
    conn: DatabaseConnection,
}

impl AnalysisRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts a record with no result. The row is committed immediately.
    pub async fn create(&self, user_id: i32, image: &str) -> Result<AnalysisRecord> {
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true);

        let active = crop_analyses::ActiveModel {
            user_id: Set(user_id),
            image: Set(image.to_string()),
            result: Set(None),
            created_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert analysis record")?;

        Ok(AnalysisRecord::from(model))
    }

    /// Stores the predictor payload on an existing record.
    pub async fn attach_result(&self, id: i32, result: Value) -> Result<AnalysisRecord> {
        let model = CropAnalyses::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query analysis record for update")?
            .ok_or_else(|| anyhow::anyhow!("Analysis record {id} not found"))?;

        let mut active: crop_analyses::ActiveModel = model.into();
        active.result = Set(Some(result));
        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to attach analysis result")?;

        Ok(AnalysisRecord::from(updated))
    }

    /// Returns `true` when a row was removed.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let res = CropAnalyses::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete analysis record")?;

        Ok(res.rows_affected > 0)
    }

    /// All records owned by `user_id`, newest first.
    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<AnalysisRecord>> {
        let rows = CropAnalyses::find()
            .filter(crop_analyses::Column::UserId.eq(user_id))
            .order_by_desc(crop_analyses::Column::CreatedAt)
            .order_by_desc(crop_analyses::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list analysis records")?;

        Ok(rows.into_iter().map(AnalysisRecord::from).collect())
    }

    pub async fn count_for_user(&self, user_id: i32) -> Result<u64> {
        CropAnalyses::find()
            .filter(crop_analyses::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await
            .context("Failed to count analysis records")
    }
}
