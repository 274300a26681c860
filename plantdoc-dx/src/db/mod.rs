//! Database access for plantdoc-dx
//!
//! Diagnosis history lives in a single SQLite file under the data folder.

pub mod diagnoses;

pub use diagnoses::{DiagnosisStore, SqliteDiagnosisStore};

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Database file name inside the data folder
pub const DATABASE_FILE: &str = "plantdoc.db";

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc creates the file on first run
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the diagnoses table if it does not exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS diagnoses (
            id TEXT PRIMARY KEY,
            plant_name TEXT NOT NULL,
            predictions TEXT NOT NULL DEFAULT '[]',
            disease_name TEXT NOT NULL,
            image_path TEXT NOT NULL,
            treatment TEXT NOT NULL,
            additional_info TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_diagnoses_created_at ON diagnoses(created_at)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (diagnoses)");

    Ok(())
}
