//! Diagnosis record persistence

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use plantdoc_common::time::{parse_rfc3339, to_iso8601};
use plantdoc_common::{Error, Result};

use crate::models::{DiagnosisRecord, EnhancedPrediction};

/// Storage for completed diagnoses
#[async_trait]
pub trait DiagnosisStore: Send + Sync {
    /// Persist a record and return it as stored
    async fn save(&self, record: DiagnosisRecord) -> Result<DiagnosisRecord>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<DiagnosisRecord>>;

    /// All records, newest first
    async fn list_all(&self) -> Result<Vec<DiagnosisRecord>>;
}

/// SQLite-backed [`DiagnosisStore`]
#[derive(Debug, Clone)]
pub struct SqliteDiagnosisStore {
    pool: SqlitePool,
}

impl SqliteDiagnosisStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, plant_name, predictions, disease_name, image_path,
           treatment, additional_info, created_at
    FROM diagnoses
"#;

fn row_to_record(row: &SqliteRow) -> Result<DiagnosisRecord> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Invalid diagnosis id {}: {}", id, e)))?;

    let predictions: String = row.get("predictions");
    let predictions: Vec<EnhancedPrediction> = serde_json::from_str(&predictions)
        .map_err(|e| Error::Internal(format!("Failed to deserialize predictions: {}", e)))?;

    let additional_info: String = row.get("additional_info");
    let additional_info: Map<String, Value> = serde_json::from_str(&additional_info)
        .map_err(|e| Error::Internal(format!("Failed to deserialize additional_info: {}", e)))?;

    let created_at: String = row.get("created_at");
    let created_at = parse_rfc3339(&created_at)?;

    Ok(DiagnosisRecord {
        id,
        plant_name: row.get("plant_name"),
        predictions,
        disease_name: row.get("disease_name"),
        image_path: row.get("image_path"),
        treatment: row.get("treatment"),
        additional_info,
        created_at,
    })
}

#[async_trait]
impl DiagnosisStore for SqliteDiagnosisStore {
    async fn save(&self, record: DiagnosisRecord) -> Result<DiagnosisRecord> {
        let predictions = serde_json::to_string(&record.predictions)
            .map_err(|e| Error::Internal(format!("Failed to serialize predictions: {}", e)))?;
        let additional_info = serde_json::to_string(&record.additional_info)
            .map_err(|e| Error::Internal(format!("Failed to serialize additional_info: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO diagnoses (
                id, plant_name, predictions, disease_name, image_path,
                treatment, additional_info, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.plant_name)
        .bind(&predictions)
        .bind(&record.disease_name)
        .bind(&record.image_path)
        .bind(&record.treatment)
        .bind(&additional_info)
        .bind(to_iso8601(&record.created_at))
        .execute(&self.pool)
        .await?;

        tracing::debug!(id = %record.id, disease = %record.disease_name, "Diagnosis saved");

        Ok(record)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<DiagnosisRecord>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn list_all(&self) -> Result<Vec<DiagnosisRecord>> {
        // rowid breaks ties between records created in the same millisecond
        let rows = sqlx::query(&format!(
            "{} ORDER BY created_at DESC, rowid DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }
}
