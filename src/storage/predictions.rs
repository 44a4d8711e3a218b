//! Prediction record storage
//!
//! Every served prediction is recorded; a correctness flag is set later when
//! actual purchase behavior is observed. These rows feed the offline accuracy
//! report only — there is no runtime feedback loop into the model.

use crate::error::{Result, StoreError};
use crate::storage::SqliteStore;
use crate::types::{CategoryId, PredictionId, PredictionRecord, UserId};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Offline accuracy aggregate
#[derive(Debug, Clone, serde::Serialize)]
pub struct PredictionAccuracy {
    pub total_predictions: i64,
    pub labeled: i64,
    pub correct: i64,
    /// correct / labeled, None until anything is labeled
    pub accuracy: Option<f64>,
    pub fallback_count: i64,
}

fn row_to_record(row: &SqliteRow) -> Result<PredictionRecord> {
    let id_str: String = row.try_get("id")?;
    let user_str: String = row.try_get("user_id")?;
    Ok(PredictionRecord {
        id: PredictionId::from_string(&id_str)?,
        user_id: UserId::from_string(&user_str)?,
        category_id: row.try_get("category_id")?,
        confidence: row.try_get("confidence")?,
        model_version: row.try_get("model_version")?,
        fallback: row.try_get("fallback")?,
        correct: row.try_get("correct")?,
        created_at: row.try_get("created_at")?,
    })
}

impl SqliteStore {
    pub async fn record_prediction(
        &self,
        user_id: UserId,
        category_id: CategoryId,
        confidence: f64,
        model_version: &str,
        fallback: bool,
    ) -> Result<PredictionRecord> {
        let id = PredictionId::new();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO prediction_records
               (id, user_id, category_id, confidence, model_version, fallback, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(category_id)
        .bind(confidence)
        .bind(model_version)
        .bind(fallback)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_prediction(id).await
    }

    pub async fn get_prediction(&self, id: PredictionId) -> Result<PredictionRecord> {
        let row = sqlx::query("SELECT * FROM prediction_records WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("prediction {}", id)))?;
        row_to_record(&row)
    }

    /// Mark a recorded prediction as borne out (or not) by later purchases
    pub async fn mark_prediction_outcome(&self, id: PredictionId, correct: bool) -> Result<()> {
        let result = sqlx::query("UPDATE prediction_records SET correct = ? WHERE id = ?")
            .bind(correct)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("prediction {}", id)));
        }
        Ok(())
    }

    pub async fn list_predictions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PredictionRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM prediction_records WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_record).collect()
    }

    pub async fn prediction_accuracy(&self) -> Result<PredictionAccuracy> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COUNT(correct) AS labeled,
                    COALESCE(SUM(CASE WHEN correct = 1 THEN 1 ELSE 0 END), 0) AS correct,
                    COALESCE(SUM(CASE WHEN fallback = 1 THEN 1 ELSE 0 END), 0) AS fallbacks
             FROM prediction_records",
        )
        .fetch_one(&self.pool)
        .await?;

        let labeled: i64 = row.try_get("labeled")?;
        let correct: i64 = row.try_get("correct")?;
        Ok(PredictionAccuracy {
            total_predictions: row.try_get("total")?,
            labeled,
            correct,
            accuracy: (labeled > 0).then(|| correct as f64 / labeled as f64),
            fallback_count: row.try_get("fallbacks")?,
        })
    }
}
