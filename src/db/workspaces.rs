// Workspace and membership storage backed by PostgreSQL

use crate::auth::Role;
use crate::error::AppError;
use crate::models::{Membership, Workspace};
use crate::repository::WorkspaceRepository;
use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use tracing::warn;
use uuid::Uuid;

pub struct PgWorkspaceRepository {
    pool: Pool,
}

impl PgWorkspaceRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn workspace_from_row(row: &Row) -> Workspace {
    Workspace {
        id: row.get("id"),
        name: row.get("name"),
        hex_color: row.get("hex_color"),
        created_at: row.get("created_at"),
    }
}

// Rows with a role outside the hierarchy grant nothing
fn parse_role(raw: &str, workspace_id: Uuid, user_id: &str) -> Option<Role> {
    match raw.parse::<Role>() {
        Ok(role) => Some(role),
        Err(e) => {
            warn!(workspace_id = %workspace_id, user_id, "{}", e);
            None
        }
    }
}

#[async_trait]
impl WorkspaceRepository for PgWorkspaceRepository {
    async fn find(&self, workspace_id: Uuid) -> Result<Option<Workspace>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, name, hex_color, created_at FROM workspaces WHERE id = $1",
                &[&workspace_id],
            )
            .await?;
        Ok(row.as_ref().map(workspace_from_row))
    }

    async fn member_role(
        &self,
        workspace_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Role>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT role FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
                &[&workspace_id, &user_id],
            )
            .await?;
        Ok(row.and_then(|r| parse_role(r.get("role"), workspace_id, user_id)))
    }

    async fn memberships(&self, user_id: &str) -> Result<Vec<Membership>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT m.workspace_id, m.role
                 FROM workspace_members m
                 JOIN workspaces w ON w.id = m.workspace_id
                 WHERE m.user_id = $1
                 ORDER BY m.workspace_id",
                &[&user_id],
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let workspace_id: Uuid = row.get("workspace_id");
                parse_role(row.get("role"), workspace_id, user_id).map(|role| Membership {
                    workspace_id,
                    user_id: user_id.to_string(),
                    role,
                })
            })
            .collect())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Workspace>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT w.id, w.name, w.hex_color, w.created_at
                 FROM workspaces w
                 JOIN workspace_members m ON m.workspace_id = w.id
                 WHERE m.user_id = $1
                 ORDER BY w.created_at DESC",
                &[&user_id],
            )
            .await?;
        Ok(rows.iter().map(workspace_from_row).collect())
    }

    async fn create(
        &self,
        name: &str,
        hex_color: &str,
        creator: &str,
    ) -> Result<Workspace, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_one(
                "INSERT INTO workspaces (id, name, hex_color, created_at)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id, name, hex_color, created_at",
                &[&Uuid::new_v4(), &name, &hex_color, &Utc::now()],
            )
            .await?;
        let workspace = workspace_from_row(&row);

        tx.execute(
            "INSERT INTO workspace_members (workspace_id, user_id, role) VALUES ($1, $2, $3)",
            &[&workspace.id, &creator, &Role::Admin.as_str()],
        )
        .await?;
        tx.commit().await?;

        Ok(workspace)
    }

    async fn upsert_member(
        &self,
        workspace_id: Uuid,
        user_id: &str,
        role: Role,
    ) -> Result<Membership, AppError> {
        let client = self.pool.get().await?;
        let inserted = client
            .execute(
                "INSERT INTO workspace_members (workspace_id, user_id, role)
                 SELECT $1::uuid, $2::text, $3::varchar
                 WHERE EXISTS (SELECT 1 FROM workspaces WHERE id = $1::uuid)
                 ON CONFLICT (workspace_id, user_id) DO UPDATE SET role = EXCLUDED.role",
                &[&workspace_id, &user_id, &role.as_str()],
            )
            .await?;

        if inserted == 0 {
            return Err(AppError::WorkspaceNotFound(format!(
                "Workspace {} not found",
                workspace_id
            )));
        }

        Ok(Membership {
            workspace_id,
            user_id: user_id.to_string(),
            role,
        })
    }
}
