// Comment storage backed by PostgreSQL

use crate::error::AppError;
use crate::models::{Comment, NewComment};
use crate::repository::CommentRepository;
use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

const COMMENT_COLUMNS: &str =
    "id, workspace_id, text_id, content, created_by, created_at, updated_at";

pub struct PgCommentRepository {
    pool: Pool,
}

impl PgCommentRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn comment_from_row(row: &Row) -> Comment {
    Comment {
        id: row.get("id"),
        workspace_id: row.get("workspace_id"),
        text_id: row.get("text_id"),
        content: row.get("content"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn list(&self, workspace_id: Uuid) -> Result<Vec<Comment>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM comments WHERE workspace_id = $1 ORDER BY created_at DESC",
            COMMENT_COLUMNS
        );
        let rows = client.query(sql.as_str(), &[&workspace_id]).await?;
        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn list_for_text(
        &self,
        text_id: Uuid,
        workspace_id: Uuid,
    ) -> Result<Vec<Comment>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM comments
             WHERE text_id = $1 AND workspace_id = $2
             ORDER BY created_at DESC",
            COMMENT_COLUMNS
        );
        let rows = client.query(sql.as_str(), &[&text_id, &workspace_id]).await?;
        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn get(&self, id: Uuid, workspace_id: Uuid) -> Result<Option<Comment>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM comments WHERE id = $1 AND workspace_id = $2",
            COMMENT_COLUMNS
        );
        let row = client.query_opt(sql.as_str(), &[&id, &workspace_id]).await?;
        Ok(row.as_ref().map(comment_from_row))
    }

    async fn create(&self, workspace_id: Uuid, comment: NewComment) -> Result<Comment, AppError> {
        let client = self.pool.get().await?;
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO comments (id, workspace_id, text_id, content, created_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             RETURNING {}",
            COMMENT_COLUMNS
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[
                    &Uuid::new_v4(),
                    &workspace_id,
                    &comment.text_id,
                    &comment.content,
                    &comment.created_by,
                    &now,
                ],
            )
            .await?;
        Ok(comment_from_row(&row))
    }

    async fn update_content(
        &self,
        id: Uuid,
        workspace_id: Uuid,
        content: &str,
    ) -> Result<Option<Comment>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "UPDATE comments SET content = $1, updated_at = $2
             WHERE id = $3 AND workspace_id = $4
             RETURNING {}",
            COMMENT_COLUMNS
        );
        let row = client
            .query_opt(sql.as_str(), &[&content, &Utc::now(), &id, &workspace_id])
            .await?;
        Ok(row.as_ref().map(comment_from_row))
    }

    async fn delete(&self, id: Uuid, workspace_id: Uuid) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(
                "DELETE FROM comments WHERE id = $1 AND workspace_id = $2",
                &[&id, &workspace_id],
            )
            .await?;
        Ok(deleted > 0)
    }

    // Usually a no-op: the foreign key cascades when the text row goes
    async fn delete_for_text(&self, text_id: Uuid, workspace_id: Uuid) -> Result<u64, AppError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(
                "DELETE FROM comments WHERE text_id = $1 AND workspace_id = $2",
                &[&text_id, &workspace_id],
            )
            .await?;
        Ok(deleted)
    }
}
