// Text storage backed by PostgreSQL
//
// Every statement filters on workspace_id so rows never leak across tenants.

use crate::error::AppError;
use crate::models::{NewText, Text, TextChanges};
use crate::repository::TextRepository;
use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

const TEXT_COLUMNS: &str = "id, workspace_id, title, content, created_by, created_at, updated_at";

pub struct PgTextRepository {
    pool: Pool,
}

impl PgTextRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn text_from_row(row: &Row) -> Text {
    Text {
        id: row.get("id"),
        workspace_id: row.get("workspace_id"),
        title: row.get("title"),
        content: row.get("content"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl TextRepository for PgTextRepository {
    async fn list(&self, workspace_id: Uuid) -> Result<Vec<Text>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM texts WHERE workspace_id = $1 ORDER BY created_at DESC",
            TEXT_COLUMNS
        );
        let rows = client.query(sql.as_str(), &[&workspace_id]).await?;
        Ok(rows.iter().map(text_from_row).collect())
    }

    async fn get(&self, id: Uuid, workspace_id: Uuid) -> Result<Option<Text>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM texts WHERE id = $1 AND workspace_id = $2",
            TEXT_COLUMNS
        );
        let row = client.query_opt(sql.as_str(), &[&id, &workspace_id]).await?;
        Ok(row.as_ref().map(text_from_row))
    }

    async fn create(&self, workspace_id: Uuid, text: NewText) -> Result<Text, AppError> {
        let client = self.pool.get().await?;
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO texts (id, workspace_id, title, content, created_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             RETURNING {}",
            TEXT_COLUMNS
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[
                    &Uuid::new_v4(),
                    &workspace_id,
                    &text.title,
                    &text.content,
                    &text.created_by,
                    &now,
                ],
            )
            .await?;
        Ok(text_from_row(&row))
    }

    async fn update(
        &self,
        id: Uuid,
        workspace_id: Uuid,
        changes: TextChanges,
    ) -> Result<Option<Text>, AppError> {
        if changes.is_empty() {
            return self.get(id, workspace_id).await;
        }

        let client = self.pool.get().await?;
        let sql = format!(
            "UPDATE texts
             SET title = COALESCE($1, title),
                 content = COALESCE($2, content),
                 updated_at = $3
             WHERE id = $4 AND workspace_id = $5
             RETURNING {}",
            TEXT_COLUMNS
        );
        let row = client
            .query_opt(
                sql.as_str(),
                &[&changes.title, &changes.content, &Utc::now(), &id, &workspace_id],
            )
            .await?;
        Ok(row.as_ref().map(text_from_row))
    }

    async fn delete(&self, id: Uuid, workspace_id: Uuid) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(
                "DELETE FROM texts WHERE id = $1 AND workspace_id = $2",
                &[&id, &workspace_id],
            )
            .await?;
        Ok(deleted > 0)
    }
}
